//! Multipart form parsing.
//!
//! Only the text fields of a `multipart/form-data` body are collected; file
//! parts are skipped. The body has already been read in full, so the
//! multipart stream is a single ready chunk and every future completes on
//! its first poll.

use crate::error::{DecodeError, DecodeResult};
use crate::request::ValueMap;
use bytes::Bytes;
use futures_util::FutureExt;
use std::future::Future;
use std::io;

const FORMAT: &str = "multipart";

/// Parses the text fields of a multipart body.
pub(crate) fn parse_values(content_type: &str, body: Bytes) -> DecodeResult<ValueMap> {
    let boundary = multer::parse_boundary(content_type)
        .map_err(|e| DecodeError::content(FORMAT, format!("invalid boundary: {e}")))?;

    let stream = futures_util::stream::once(async move { Ok::<_, io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut values = ValueMap::new();
    while let Some(field) = ready(multipart.next_field())? {
        if field.file_name().is_some() {
            continue;
        }
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        let text = ready(field.text())?;
        values.append(name, text);
    }

    Ok(values)
}

fn ready<T>(future: impl Future<Output = Result<T, multer::Error>>) -> DecodeResult<T> {
    match future.now_or_never() {
        Some(result) => result.map_err(|e| DecodeError::content(FORMAT, e)),
        None => Err(DecodeError::content(FORMAT, "multipart stream did not complete")),
    }
}
