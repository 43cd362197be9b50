use std::collections::VecDeque;

/// Digit base of the polynomial rolling hash; per-token hashes are folded
/// to 8 bits so they stay below the base.
const HASH_BASE: u64 = 256;
/// Modulus of the rolling hash (prime).
const HASH_MOD: u64 = 16777619;

const FNV32_OFFSET_BASIS: u32 = 2166136261;
const FNV32_PRIME: u32 = 16777619;

/// Per-token hash: the FNV-1 32-bit hash of the token text, XOR-folded
/// down to 8 bits. Single-character tokens (`{`, `+`, ...) hash to their
/// leading byte directly.
pub(crate) fn token_hash(text: &str) -> u64 {
    let bytes = text.as_bytes();
    if bytes.len() == 1 {
        return u64::from(bytes[0]);
    }
    let mut hash = FNV32_OFFSET_BASIS;
    for &b in bytes {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(FNV32_PRIME);
    }
    let folded = (hash >> 16) ^ (hash & 0xffff);
    u64::from((folded >> 8) ^ (folded & 0xff))
}

/// A window's worth of state handed back on eviction: the hash of the full
/// window *before* the oldest token's contribution is removed, and the
/// index of that oldest token. Callers index/query the window before
/// sliding past it; doing it after would lose the candidate position.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EvictedWindow {
    pub(crate) window_hash: u64,
    pub(crate) first_index: usize,
}

/// Incrementally maintained hash over the last `window` tokens:
/// `H = H * BASE + tokenHash (mod M)` on insertion, with the oldest
/// token's `hash * BASE^(window-1)` removed on eviction.
#[derive(Debug)]
pub(crate) struct RollingHash {
    window: usize,
    hash: u64,
    /// (token hash, token index) pairs currently inside the window.
    queue: VecDeque<(u64, usize)>,
    /// `BASE^(window-1) mod M`, precomputed once.
    roll_base: u64,
}

impl RollingHash {
    pub(crate) fn new(window: usize) -> Self {
        assert!(window >= 1, "window size must be at least 1");
        let mut roll_base = 1u64;
        for _ in 0..window - 1 {
            roll_base = (roll_base * HASH_BASE) % HASH_MOD;
        }
        Self {
            window,
            hash: 0,
            queue: VecDeque::with_capacity(window),
            roll_base,
        }
    }

    /// Fold one token into the hash. The caller must have called `evict`
    /// first when the window is full.
    pub(crate) fn add(&mut self, token_hash: u64, token_index: usize) {
        debug_assert!(self.queue.len() < self.window);
        self.hash = (self.hash * HASH_BASE + token_hash) % HASH_MOD;
        self.queue.push_back((token_hash, token_index));
    }

    pub(crate) fn is_full(&self) -> bool {
        self.queue.len() >= self.window
    }

    /// Remove the oldest token's contribution, returning the pre-eviction
    /// window hash and the evicted token's index. Returns `None` while the
    /// window is not yet full.
    pub(crate) fn evict(&mut self) -> Option<EvictedWindow> {
        if !self.is_full() {
            return None;
        }
        let (first_hash, first_index) = self.queue.pop_front().expect("window is full");
        let window_hash = self.hash;
        self.hash = (self.hash + HASH_MOD - (first_hash * self.roll_base) % HASH_MOD) % HASH_MOD;
        Some(EvictedWindow {
            window_hash,
            first_index,
        })
    }

    /// Clear all window state. Called at every file boundary; windows never
    /// span two files.
    pub(crate) fn restart(&mut self) {
        self.hash = 0;
        self.queue.clear();
    }
}
