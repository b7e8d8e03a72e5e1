use crate::util::error::Result;

pub trait ByteSerializable: Sized {
    fn to_bytes(&self) -> Vec<u8>;
    fn from_bytes(bytes: &[u8]) -> Result<Self>;
}

pub trait KnownSize: ByteSerializable {
    fn size_on_disk() -> usize;
}
