//! Framing for the mapper to reducer stream.
//!
//! Every [`Batch`] travels as one length-delimited frame: a 4-byte big-endian
//! length followed by the JSON encoding of the batch.

use std::time::SystemTime;

use anyhow::Result;
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

use crate::Word;

/// Largest frame the decoder accepts.
pub const MAX_FRAME_LENGTH: usize = 64 * 1024 * 1024;

/// The unit of wire transmission: an ordered group of words.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    /// When the batch was sealed by the sender.
    pub timestamp: SystemTime,
    /// The words, in enqueue order.
    pub words: Vec<Word>,
}

impl Batch {
    /// Seals `words` into a batch stamped with the current time.
    pub fn new(words: Vec<Word>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            words,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Encodes and decodes [`Batch`]es on a byte stream.
#[derive(Debug)]
pub struct BatchCodec {
    frames: LengthDelimitedCodec,
}

impl BatchCodec {
    pub fn new() -> Self {
        Self {
            frames: LengthDelimitedCodec::builder()
                .max_frame_length(MAX_FRAME_LENGTH)
                .new_codec(),
        }
    }
}

impl Default for BatchCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for BatchCodec {
    type Item = Batch;
    type Error = anyhow::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Batch>> {
        match self.frames.decode(src)? {
            Some(frame) => Ok(Some(serde_json::from_slice(&frame)?)),
            None => Ok(None),
        }
    }
}

impl<'a> Encoder<&'a Batch> for BatchCodec {
    type Error = anyhow::Error;

    fn encode(&mut self, batch: &'a Batch, dst: &mut BytesMut) -> Result<()> {
        let payload = serde_json::to_vec(batch)?;
        self.frames.encode(Bytes::from(payload), dst)?;
        Ok(())
    }
}
