/// Free list of reusable `String` buffers for rendering generated code.
///
/// Owned by the caller and passed into [`generate`](super::generate) explicitly, so
/// buffers can be reused across generation runs without any thread-local state.
#[derive(Debug, Default)]
pub struct BufferPool {
    free: Vec<String>,
    max_retained: usize,
    created: usize,
}

impl BufferPool {
    /// Buffers beyond this many are dropped instead of retained
    pub const DEFAULT_MAX_RETAINED: usize = 32;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_MAX_RETAINED)
    }

    pub fn with_capacity(max_retained: usize) -> Self {
        BufferPool {
            free: Vec::new(),
            max_retained,
            created: 0,
        }
    }

    /// Take an empty buffer, reusing a returned one when available
    pub fn take(&mut self) -> String {
        match self.free.pop() {
            Some(buf) => buf,
            None => {
                self.created += 1;
                String::with_capacity(1024)
            }
        }
    }

    /// Return a buffer; its contents are cleared, its capacity is kept
    pub fn give_back(&mut self, mut buf: String) {
        if self.free.len() < self.max_retained {
            buf.clear();
            self.free.push(buf);
        }
    }

    /// Buffers currently available for reuse
    #[must_use]
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Buffers allocated over the pool's lifetime
    #[must_use]
    pub fn created(&self) -> usize {
        self.created
    }
}
