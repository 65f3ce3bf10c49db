use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::node::{record_size, Node};
use crate::Offset;

/// Read/write counters, for logging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats
{
    pub reads: u64,
    pub writes: u64,
}

/// Fixed-size node records at byte offsets of a seekable buffer.
///
/// Writes go to the node's own offset and never append anywhere else, so
/// the end of the buffer is always the next free slot.
#[derive(Debug)]
pub struct RecordStore<F>
{
    inner: F,
    degree: u32,
    record_size: u64,
    buffer: Vec<u8>,
    stats: StoreStats,
}

impl RecordStore<File>
{
    /// Truncates whatever is at `path`
    pub fn create_file<P: AsRef<Path>>(path: P, degree: u32) -> Result<Self>
    {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(RecordStore::new(file, degree))
    }
}

impl<F> RecordStore<F>
{
    pub fn new(inner: F, degree: u32) -> Self
    {
        let record_size = record_size(degree);
        RecordStore {
            inner,
            degree,
            record_size,
            buffer: Vec::with_capacity(record_size as usize),
            stats: StoreStats::default(),
        }
    }

    pub fn degree(&self) -> u32
    {
        self.degree
    }

    pub fn record_size(&self) -> u64
    {
        self.record_size
    }

    pub fn stats(&self) -> StoreStats
    {
        self.stats
    }

    pub fn into_inner(self) -> F
    {
        self.inner
    }
}

impl<F: Read + Write + Seek> RecordStore<F>
{
    /// Offset the next allocated node will get
    pub fn end_offset(&mut self) -> Result<Offset>
    {
        let end = self.inner.seek(SeekFrom::End(0))?;
        if end % self.record_size != 0 {
            return Err(Error::corruption(format!(
                "tree file is {end} bytes, not a multiple of the {} byte record size",
                self.record_size
            )));
        }
        Ok(end)
    }

    pub fn read(&mut self, offset: Offset) -> Result<Node>
    {
        log::trace!("Reading node at offset {offset}");
        self.buffer.resize(self.record_size as usize, 0);
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.read_exact(&mut self.buffer)?;
        self.stats.reads += 1;
        Node::decode_record(&self.buffer, self.degree, offset)
    }

    /// Overwrites the record at `node.offset`
    pub fn write(&mut self, node: &Node) -> Result<()>
    {
        log::trace!("Writing node at offset {}", node.offset);
        self.buffer.clear();
        node.encode_record(self.degree, &mut self.buffer)?;
        self.inner.seek(SeekFrom::Start(node.offset))?;
        self.inner.write_all(&self.buffer)?;
        self.stats.writes += 1;
        Ok(())
    }

    /// Writes `node` at the current end of the buffer, claiming that slot
    pub fn append(&mut self, node: &mut Node) -> Result<Offset>
    {
        node.offset = self.end_offset()?;
        self.write(node)?;
        Ok(node.offset)
    }

    pub fn flush(&mut self) -> Result<()>
    {
        self.inner.flush()?;
        Ok(())
    }
}
