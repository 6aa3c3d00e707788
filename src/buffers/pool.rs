use std::sync::{Arc, Mutex};

/// Recycles byte buffers so workers can batch frames without
/// allocating on every iteration.
pub struct BufferPool {
    buffers: Arc<Mutex<Vec<Vec<u8>>>>,
    capacity: usize,
}

impl BufferPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffers: Arc::new(Mutex::new(Vec::new())),
            capacity,
        }
    }

    pub fn get(&self) -> PooledBuffer {
        let mut buffers = self.buffers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let buffer = buffers.pop().unwrap_or_else(|| {
            Vec::with_capacity(self.capacity)
        });

        PooledBuffer {
            buffer,
            pool: self.buffers.clone(),
        }
    }

    pub fn pool_size(&self) -> usize {
        self.buffers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl Clone for BufferPool {
    fn clone(&self) -> Self {
        Self {
            buffers: self.buffers.clone(),
            capacity: self.capacity,
        }
    }
}

/// Buffer on loan from a [`BufferPool`]; returned cleared on drop.
pub struct PooledBuffer {
    buffer: Vec<u8>,
    pool: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let mut buffer = std::mem::take(&mut self.buffer);
        buffer.clear();
        let mut pool = self.pool
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        pool.push(buffer);
    }
}

impl std::ops::Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.buffer
    }
}

impl std::ops::DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_returns_to_pool_cleared() {
        let pool = BufferPool::new(64);
        {
            let mut buffer = pool.get();
            buffer.extend_from_slice(&[1, 2, 3]);
            assert_eq!(buffer.len(), 3);
        }
        assert_eq!(pool.pool_size(), 1);

        let buffer = pool.get();
        assert!(buffer.is_empty());
        assert!(buffer.capacity() >= 64);
        assert_eq!(pool.pool_size(), 0);
    }
}
