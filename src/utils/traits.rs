use bincode::config;
use serde::{de::DeserializeOwned, Serialize};

use crate::fs::FsError;

/// Trait for records stored in a fixed-size slot of the partition
/// # Note
/// Records are encoded with bincode's legacy configuration,
/// so integers are fixed width and little endian.
/// An all-zero slot decodes as the record's zero value.
pub trait FixedRecord: Serialize + DeserializeOwned + Default {
    /// the largest encoded size a slot may hold
    const RECORD_SIZE: usize;

    /// serialize into a [Vec](std::vec::Vec) holding exactly the encoded bytes
    fn encode_record(&self) -> Result<Vec<u8>, FsError> {
        let config = config::legacy();
        let bytes = bincode::serde::encode_to_vec(self, config)?;
        if bytes.len() > Self::RECORD_SIZE {
            return Err(FsError::Format(format!(
                "record needs {} bytes but its slot holds {}",
                bytes.len(),
                Self::RECORD_SIZE
            )));
        }
        Ok(bytes)
    }

    /// serialize into `slot`, zero-filling whatever the record doesn't use
    /// # Returns
    /// The number of bytes the record occupies
    fn encode_into(&self, slot: &mut [u8]) -> Result<usize, FsError> {
        let bytes = self.encode_record()?;
        let len = bytes.len();
        if len > slot.len() {
            return Err(FsError::Format(format!(
                "record needs {len} bytes but the slot is {} bytes",
                slot.len()
            )));
        }
        slot[..len].copy_from_slice(&bytes);
        slot[len..].fill(0);
        Ok(len)
    }

    /// deserialize from the start of a slot
    fn decode_record(slot: &[u8]) -> Result<Self, FsError> {
        let config = config::legacy();
        let (record, _bytes_read): (Self, usize) = bincode::serde::decode_from_slice(slot, config)?;
        Ok(record)
    }

    /// the encoded size of the zero value
    ///
    /// records without optional fields always encode to this size
    fn encoded_len() -> Result<usize, FsError> {
        Ok(Self::default().encode_record()?.len())
    }
}
