use bytes::{Bytes, BytesMut};
use futures::future::ready;
use futures::{Stream, StreamExt};

// byte-stream transformers used to make tool output concatenatable: every
// body invocation of samtools/bcftools emits a complete file, so its embedded
// header (and, for bam, trailing eof block) must be dropped before the bytes
// reach the client.  both operate on opaque chunk streams and are composable
// in front of any source

// discards the first `skip` bytes, forwarding everything after
pub fn head_trim<S>(stream: S, skip: u64) -> impl Stream<Item = std::io::Result<Bytes>>
where
    S: Stream<Item = std::io::Result<Bytes>>,
{
    stream
        .scan(skip, |remaining, item| {
            let out = match item {
                Err(err) => Some(Err(err)),
                Ok(mut chunk) => {
                    if *remaining == 0 {
                        Some(Ok(chunk))
                    } else if (chunk.len() as u64) <= *remaining {
                        *remaining -= chunk.len() as u64;
                        None
                    } else {
                        let kept = chunk.split_off(*remaining as usize);
                        *remaining = 0;
                        Some(Ok(kept))
                    }
                }
            };

            ready(Some(out))
        })
        .filter_map(ready)
}

// withholds the final `hold_back` bytes: bytes enter the ring, bytes leaving
// the ring are forwarded, and whatever remains at eof is discarded.  never
// buffers more than `hold_back` bytes between chunks
pub fn tail_trim<S>(stream: S, hold_back: usize) -> impl Stream<Item = std::io::Result<Bytes>>
where
    S: Stream<Item = std::io::Result<Bytes>>,
{
    stream
        .scan(BytesMut::new(), move |ring, item| {
            let out = match item {
                Err(err) => Some(Err(err)),
                Ok(chunk) => {
                    if hold_back == 0 {
                        Some(Ok(chunk))
                    } else {
                        ring.extend_from_slice(&chunk);

                        if ring.len() > hold_back {
                            let emit = ring.split_to(ring.len() - hold_back);
                            Some(Ok(emit.freeze()))
                        } else {
                            None
                        }
                    }
                }
            };

            ready(Some(out))
        })
        .filter_map(ready)
}
