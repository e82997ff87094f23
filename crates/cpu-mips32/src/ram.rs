//! Block-paged RAM.
//!
//! The guest sees a flat 4 GiB word-addressed space. Storage is organized
//! in 64 KiB blocks created lazily on first touch. At most
//! `alloc_limit / BLOCK_SIZE` blocks are resident in memory; beyond that,
//! the least-accessed block is spilled to a file named after its base
//! address (`0xXXXXXXXX.block`, raw host-endian words) and its slot is
//! reused.
//!
//! Spill I/O failures are fatal: the simulator cannot continue without
//! its backing store.

use std::fs;
use std::path::{Path, PathBuf};

/// Size of a block in bytes of guest address space.
pub const BLOCK_SIZE: u32 = 0x1_0000;

/// Words stored per block.
pub const BLOCK_WORDS: usize = (BLOCK_SIZE / 4) as usize;

/// A resident portion of the address space: `BLOCK_WORDS` owned words.
#[derive(Debug)]
pub(crate) struct Block {
    pub(crate) base_address: u32,
    /// Bumped on every `Ram::word` hit; reset by the eviction sweep.
    pub(crate) access_count: u32,
    pub(crate) data: Vec<u32>,
}

impl Block {
    fn new(base_address: u32) -> Self {
        Self {
            base_address,
            access_count: 0,
            data: vec![0; BLOCK_WORDS],
        }
    }

    fn contains(&self, address: u32) -> bool {
        contains(self.base_address, address)
    }
}

/// A block whose words live only in its spill file.
#[derive(Debug)]
pub(crate) struct SwappedBlock {
    pub(crate) base_address: u32,
}

fn contains(base: u32, address: u32) -> bool {
    u64::from(base) <= u64::from(address)
        && u64::from(address) < u64::from(base) + u64::from(BLOCK_SIZE)
}

/// Base address of the block covering `address`.
#[must_use]
pub fn block_base(address: u32) -> u32 {
    address & !(BLOCK_SIZE - 1)
}

/// Spill file name for a block base address.
#[must_use]
pub fn block_file_name(base_address: u32) -> String {
    format!("0x{base_address:08X}.block")
}

/// Where an address currently lives.
pub(crate) enum Located {
    Resident(usize),
    Swapped(usize),
    Missing,
}

/// Read-only view of a resident block, for inspection and snapshots.
#[derive(Debug, Clone, Copy)]
pub struct BlockView<'a> {
    pub base_address: u32,
    pub access_count: u32,
    pub data: &'a [u32],
}

/// The simulated main memory.
#[derive(Debug)]
pub struct Ram {
    /// Maximum number of resident blocks.
    limit_blocks: u32,
    blocks: Vec<Block>,
    swapped: Vec<SwappedBlock>,
    spill_dir: PathBuf,
}

impl Ram {
    /// Create a RAM with an in-memory budget of `alloc_limit` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `alloc_limit` is zero or not a multiple of [`BLOCK_SIZE`].
    #[must_use]
    pub fn new(alloc_limit: u32) -> Self {
        assert!(alloc_limit != 0, "the allocation limit can't be zero");
        assert!(
            alloc_limit % BLOCK_SIZE == 0,
            "the allocation limit must be a multiple of the block size"
        );

        Self {
            limit_blocks: alloc_limit / BLOCK_SIZE,
            blocks: Vec::with_capacity((alloc_limit / BLOCK_SIZE) as usize),
            swapped: Vec::new(),
            spill_dir: PathBuf::from("."),
        }
    }

    /// Redirect spill files to `dir` instead of the working directory.
    #[must_use]
    pub fn with_spill_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.set_spill_dir(dir);
        self
    }

    /// See [`Ram::with_spill_dir`].
    pub fn set_spill_dir<P: AsRef<Path>>(&mut self, dir: P) {
        self.spill_dir = dir.as_ref().to_path_buf();
    }

    /// In-memory budget in bytes.
    #[must_use]
    pub fn alloc_limit(&self) -> u32 {
        self.limit_blocks * BLOCK_SIZE
    }

    /// Maximum number of resident blocks.
    #[must_use]
    pub fn limit_blocks(&self) -> u32 {
        self.limit_blocks
    }

    #[must_use]
    pub fn resident_count(&self) -> u32 {
        self.blocks.len() as u32
    }

    #[must_use]
    pub fn swapped_count(&self) -> u32 {
        self.swapped.len() as u32
    }

    #[must_use]
    pub fn resident_addresses(&self) -> Vec<u32> {
        self.blocks.iter().map(|b| b.base_address).collect()
    }

    #[must_use]
    pub fn swapped_addresses(&self) -> Vec<u32> {
        self.swapped.iter().map(|s| s.base_address).collect()
    }

    /// Views of every resident block, in slot order.
    pub fn resident_blocks(&self) -> impl Iterator<Item = BlockView<'_>> {
        self.blocks.iter().map(|b| BlockView {
            base_address: b.base_address,
            access_count: b.access_count,
            data: &b.data,
        })
    }

    /// The word containing `address` (the low two address bits are masked).
    ///
    /// Touching a new region allocates its block; touching a spilled
    /// region swaps it back in at the expense of the least-accessed
    /// resident block.
    pub fn word(&mut self, address: u32) -> &mut u32 {
        // Resident hit.
        if let Some(i) = self.blocks.iter().position(|b| b.contains(address)) {
            let block = &mut self.blocks[i];
            block.access_count += 1;
            let index = word_index(address, block.base_address);
            return &mut block.data[index];
        }

        // Swapped hit: trade places with the least-accessed resident block.
        if let Some(i) = self
            .swapped
            .iter()
            .position(|s| contains(s.base_address, address))
        {
            let victim = self.least_accessed();
            let evicted_base = self.blocks[victim].base_address;

            self.serialize_block(victim);
            self.blocks[victim].base_address = self.swapped[i].base_address;
            self.deserialize_block(victim);
            self.swapped[i].base_address = evicted_base;

            let block = &mut self.blocks[victim];
            block.access_count += 1;
            let index = word_index(address, block.base_address);
            return &mut block.data[index];
        }

        // The block doesn't exist yet.
        let slot = if self.blocks.len() < self.limit_blocks as usize {
            self.blocks.push(Block::new(block_base(address)));
            self.blocks.len() - 1
        } else {
            let victim = self.least_accessed();
            self.swapped.push(SwappedBlock {
                base_address: self.blocks[victim].base_address,
            });
            self.serialize_block(victim);
            // The slot keeps the evictee's words; the guest has never read
            // this region before, so their value is unobservable until
            // written.
            self.blocks[victim].base_address = block_base(address);
            victim
        };

        let block = &mut self.blocks[slot];
        block.access_count += 1;
        let index = word_index(address, block.base_address);
        &mut block.data[index]
    }

    /// Select the eviction victim: stable-sort by access count descending
    /// (ties keep insertion order), reset every counter, take the tail.
    fn least_accessed(&mut self) -> usize {
        self.blocks
            .sort_by(|lhs, rhs| rhs.access_count.cmp(&lhs.access_count));

        for block in &mut self.blocks {
            block.access_count = 0;
        }

        self.blocks.len() - 1
    }

    pub(crate) fn locate(&self, address: u32) -> Located {
        if let Some(i) = self.blocks.iter().position(|b| b.contains(address)) {
            return Located::Resident(i);
        }
        if let Some(i) = self
            .swapped
            .iter()
            .position(|s| contains(s.base_address, address))
        {
            return Located::Swapped(i);
        }
        Located::Missing
    }

    pub(crate) fn resident_block_mut(&mut self, index: usize) -> &mut Block {
        &mut self.blocks[index]
    }

    pub(crate) fn resident_block(&self, index: usize) -> &Block {
        &self.blocks[index]
    }

    /// Materialize the block covering `address` without touching a word:
    /// resident when there is room, spilled straight to disk otherwise.
    pub(crate) fn materialize(&mut self, address: u32) {
        let base = block_base(address);
        if self.blocks.len() < self.limit_blocks as usize {
            self.blocks.push(Block::new(base));
        } else {
            self.write_spilled_block(base, &vec![0; BLOCK_WORDS])
                .unwrap_or_else(|e| panic!("failed to create block file for 0x{base:08X}: {e}"));
            self.swapped.push(SwappedBlock { base_address: base });
        }
    }

    fn spill_path(&self, base_address: u32) -> PathBuf {
        self.spill_dir.join(block_file_name(base_address))
    }

    fn serialize_block(&self, index: usize) {
        let block = &self.blocks[index];
        self.write_spilled_block(block.base_address, &block.data)
            .unwrap_or_else(|e| {
                panic!(
                    "failed to write block file for 0x{:08X}: {e}",
                    block.base_address
                )
            });
    }

    fn deserialize_block(&mut self, index: usize) {
        let base = self.blocks[index].base_address;
        let words = self
            .spilled_block_data(base)
            .unwrap_or_else(|e| panic!("failed to read block file for 0x{base:08X}: {e}"));
        self.blocks[index].data = words;
    }

    /// Read a spilled block's words from its file.
    pub fn spilled_block_data(&self, base_address: u32) -> std::io::Result<Vec<u32>> {
        let bytes = fs::read(self.spill_path(base_address))?;
        if bytes.len() != BLOCK_SIZE as usize {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("block file for 0x{base_address:08X} has the wrong size"),
            ));
        }

        let mut words = vec![0u32; BLOCK_WORDS];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
            *word = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(words)
    }

    /// Write a spilled block's words to its file.
    pub fn write_spilled_block(&self, base_address: u32, words: &[u32]) -> std::io::Result<()> {
        let mut bytes = Vec::with_capacity(BLOCK_SIZE as usize);
        for word in words {
            bytes.extend_from_slice(&word.to_ne_bytes());
        }
        fs::write(self.spill_path(base_address), bytes)
    }

    /// Replace the whole RAM state. Used by snapshot restore: resident
    /// blocks are rebuilt in memory, swapped blocks are rewritten to
    /// their spill files.
    pub fn restore(
        &mut self,
        limit_blocks: u32,
        resident: Vec<(u32, u32, Vec<u32>)>,
        swapped: Vec<(u32, Vec<u32>)>,
    ) -> std::io::Result<()> {
        self.limit_blocks = limit_blocks;
        self.blocks = resident
            .into_iter()
            .map(|(base_address, access_count, data)| Block {
                base_address,
                access_count,
                data,
            })
            .collect();

        self.swapped.clear();
        for (base_address, data) in swapped {
            self.write_spilled_block(base_address, &data)?;
            self.swapped.push(SwappedBlock { base_address });
        }
        Ok(())
    }
}

fn word_index(address: u32, base: u32) -> usize {
    (((address & !0b11) - base) / 4) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ram_in(dir: &tempfile::TempDir, blocks: u32) -> Ram {
        Ram::new(blocks * BLOCK_SIZE).with_spill_dir(dir.path())
    }

    #[test]
    fn starts_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ram = ram_in(&dir, 4);

        assert_eq!(ram.alloc_limit(), 4 * BLOCK_SIZE);
        assert_eq!(ram.resident_count(), 0);
        assert_eq!(ram.swapped_count(), 0);
    }

    #[test]
    fn first_touch_allocates_one_block() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ram = ram_in(&dir, 4);

        *ram.word(0) = 0xABCD_0123;

        assert_eq!(ram.resident_count(), 1);
        assert_eq!(ram.swapped_count(), 0);
        assert_eq!(*ram.word(0), 0xABCD_0123);
    }

    #[test]
    fn words_in_one_block_are_independent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ram = ram_in(&dir, 1);

        for i in (0..256 * 4).step_by(4) {
            *ram.word(i) = i;
        }
        for i in (0..256 * 4).step_by(4) {
            assert_eq!(*ram.word(i), i);
        }
        assert_eq!(ram.resident_count(), 1);
    }

    #[test]
    fn low_address_bits_are_masked() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ram = ram_in(&dir, 1);

        *ram.word(0x100) = 7;
        assert_eq!(*ram.word(0x101), 7);
        assert_eq!(*ram.word(0x103), 7);
    }

    #[test]
    fn touching_past_the_limit_spills() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ram = ram_in(&dir, 1);

        ram.word(0);
        ram.word(BLOCK_SIZE);

        assert_eq!(ram.resident_count(), 1);
        assert_eq!(ram.swapped_count(), 1);
        assert_eq!(ram.swapped_addresses(), vec![0]);
        assert!(dir.path().join(block_file_name(0)).exists());
    }

    #[test]
    fn many_blocks_one_slot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ram = ram_in(&dir, 1);

        for i in 0..10 {
            ram.word(i * BLOCK_SIZE);
        }

        assert_eq!(ram.resident_count(), 1);
        assert_eq!(ram.swapped_count(), 9);
    }

    #[test]
    fn swapped_blocks_trade_places_and_keep_their_words() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ram = ram_in(&dir, 1);

        *ram.word(0) = 0x1111_1111;
        *ram.word(BLOCK_SIZE) = 0x2222_2222;

        assert_eq!(ram.swapped_addresses(), vec![0]);

        assert_eq!(*ram.word(0), 0x1111_1111);
        assert_eq!(ram.resident_addresses(), vec![0]);
        assert_eq!(ram.swapped_addresses(), vec![BLOCK_SIZE]);

        assert_eq!(*ram.word(BLOCK_SIZE), 0x2222_2222);
    }

    #[test]
    fn eviction_prefers_the_least_accessed_block() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ram = ram_in(&dir, 2);

        // Block A is hot, block B is cold.
        for _ in 0..10 {
            ram.word(0);
        }
        ram.word(BLOCK_SIZE);

        // Allocating a third block must evict B.
        ram.word(2 * BLOCK_SIZE);

        assert_eq!(ram.swapped_addresses(), vec![BLOCK_SIZE]);
    }

    #[test]
    fn restore_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ram = ram_in(&dir, 1);

        *ram.word(0) = 0xAA;
        *ram.word(BLOCK_SIZE) = 0xBB;

        let resident: Vec<_> = ram
            .resident_blocks()
            .map(|b| (b.base_address, b.access_count, b.data.to_vec()))
            .collect();
        let swapped: Vec<_> = ram
            .swapped_addresses()
            .into_iter()
            .map(|base| (base, ram.spilled_block_data(base).expect("spill data")))
            .collect();

        let mut other = ram_in(&dir, 1);
        other.restore(1, resident, swapped).expect("restore");

        assert_eq!(*other.word(BLOCK_SIZE), 0xBB);
        assert_eq!(*other.word(0), 0xAA);
    }
}
