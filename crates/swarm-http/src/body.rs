//! Reading whole request and response bodies

use bytes::Bytes;
use http_body::Body;
use http_body_util::BodyExt;

/// Collects every data frame of `body` into one buffer; trailers are dropped.
///
/// Bodies are small GraphQL documents and responses, so they are always
/// buffered whole before being sent or inspected.
pub async fn body_to_bytes<B>(body: &mut B) -> Result<Bytes, B::Error>
where
    B: Body<Data = Bytes> + Unpin,
{
    let collected = body.collect().await?;
    Ok(collected.to_bytes())
}
