//! Deferred offset/size fields.
//!
//! Many CIFS layouts carry an offset or length whose value is only known
//! after later fields have been serialized. [`PosMarker`] wraps such a
//! field: it remembers its own stream position when read or written, so a
//! later write step can seek back and patch the real value in.

use std::cell::Cell;
use std::io::SeekFrom;

use binrw::io::{Read, Seek, Write};
use binrw::{BinRead, BinResult, BinWrite, Endian};

/// A wire field whose final value is back-patched after serialization.
///
/// On read, the marker records the position the value was read from, so
/// offset fields can later be resolved relative to it. On write, the
/// current value (usually a placeholder) is emitted and the position
/// recorded; one of the `write_*` helpers then patches the real value.
#[derive(Debug, Clone)]
pub struct PosMarker<T> {
    pub pos: Cell<u64>,
    pub value: T,
}

impl<T> PosMarker<T> {
    pub fn new(value: T) -> Self {
        Self {
            pos: Cell::new(0),
            value,
        }
    }
}

impl<T> BinRead for PosMarker<T>
where
    T: for<'a> BinRead<Args<'a> = ()>,
{
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let pos = reader.stream_position()?;
        let value = T::read_options(reader, endian, ())?;
        Ok(Self {
            pos: Cell::new(pos),
            value,
        })
    }
}

impl<T> BinWrite for PosMarker<T>
where
    T: for<'a> BinWrite<Args<'a> = ()>,
{
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        self.pos.set(writer.stream_position()?);
        self.value.write_options(writer, endian, ())
    }
}

impl<T> PosMarker<T>
where
    T: for<'a> BinWrite<Args<'a> = ()> + TryFrom<u64> + Copy,
{
    /// Seeks back to the marker position, writes `value` there, and
    /// restores the stream position.
    fn patch<W: Write + Seek>(&self, value: u64, writer: &mut W, endian: Endian) -> BinResult<()> {
        let patched = T::try_from(value).map_err(|_| binrw::Error::AssertFail {
            pos: self.pos.get(),
            message: "back-patched value does not fit the marker field".into(),
        })?;
        let return_to = writer.stream_position()?;
        writer.seek(SeekFrom::Start(self.pos.get()))?;
        patched.write_options(writer, endian, ())?;
        writer.seek(SeekFrom::Start(return_to))?;
        Ok(())
    }

    /// Writes `value`, patching `this` with the absolute stream offset
    /// where `value`'s bytes begin.
    #[binrw::writer(writer, endian)]
    pub fn write_aoff<U>(value: &U, this: &Self) -> BinResult<()>
    where
        U: BinWrite,
        for<'b> U::Args<'b>: Default,
    {
        let start = writer.stream_position()?;
        value.write_options(writer, endian, Default::default())?;
        this.patch(start, writer, endian)
    }

    /// Writes `value`, patching `this` with the offset of `value`'s bytes
    /// relative to the marker's own position.
    #[binrw::writer(writer, endian)]
    pub fn write_roff<U>(value: &U, this: &Self) -> BinResult<()>
    where
        U: BinWrite,
        for<'b> U::Args<'b>: Default,
    {
        let start = writer.stream_position()?;
        value.write_options(writer, endian, Default::default())?;
        this.patch(start - this.pos.get(), writer, endian)
    }

    /// Writes `value`, patching `this` with the number of bytes written.
    #[binrw::writer(writer, endian)]
    pub fn write_size<U>(value: &U, this: &Self) -> BinResult<()>
    where
        U: BinWrite,
        for<'b> U::Args<'b>: Default,
    {
        let start = writer.stream_position()?;
        value.write_options(writer, endian, Default::default())?;
        let end = writer.stream_position()?;
        this.patch(end - start, writer, endian)
    }

    /// Writes `value`, patching `offset` with its absolute start offset
    /// and `size` with its byte length.
    #[binrw::writer(writer, endian)]
    pub fn write_aoff_size<U, S>(value: &U, offset: &Self, size: &PosMarker<S>) -> BinResult<()>
    where
        U: BinWrite,
        for<'b> U::Args<'b>: Default,
        S: for<'a> BinWrite<Args<'a> = ()> + TryFrom<u64> + Copy,
    {
        let start = writer.stream_position()?;
        value.write_options(writer, endian, Default::default())?;
        let end = writer.stream_position()?;
        offset.patch(start, writer, endian)?;
        size.patch(end - start, writer, endian)
    }
}

impl<T> PosMarker<T>
where
    T: Into<u64> + Copy,
{
    /// Returns a seek target at `value` bytes past the marker's position.
    ///
    /// With `allow_zero` unset, a zero value instead targets the marker
    /// position itself, so a chained-list reader observes an unmoved
    /// stream and stops.
    pub fn seek_relative(&self, allow_zero: bool) -> SeekFrom {
        let value = self.value.into();
        if value == 0 && !allow_zero {
            SeekFrom::Start(self.pos.get())
        } else {
            SeekFrom::Start(self.pos.get() + value)
        }
    }
}

impl<T: Default> Default for PosMarker<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: PartialEq> PartialEq for PosMarker<T> {
    /// Markers compare by value; the recorded position is bookkeeping.
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: Eq> Eq for PosMarker<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use binrw::prelude::*;

    #[binrw::binrw]
    #[derive(Debug, PartialEq, Eq)]
    #[brw(little)]
    struct SizedBlob {
        #[bw(calc = PosMarker::default())]
        #[br(temp)]
        size: PosMarker<u16>,
        #[br(count = size.value)]
        #[bw(write_with = PosMarker::write_size, args(&size))]
        data: Vec<u8>,
    }

    cifs_tests::test_binrw! {
        struct SizedBlob {
            data: vec![0xaa, 0xbb, 0xcc],
        } => "0300aabbcc"
    }

    #[binrw::binrw]
    #[derive(Debug, PartialEq, Eq)]
    #[brw(little)]
    struct OffsetBlob {
        marker: u8,
        #[bw(calc = PosMarker::default())]
        #[br(temp)]
        offset: PosMarker<u16>,
        #[br(seek_before = SeekFrom::Start(offset.value.into()))]
        #[br(count = 2)]
        #[bw(write_with = PosMarker::write_aoff, args(&offset))]
        data: Vec<u8>,
    }

    cifs_tests::test_binrw! {
        struct OffsetBlob {
            marker: 0x7f,
            data: vec![0x11, 0x22],
        } => "7f03001122"
    }
}
