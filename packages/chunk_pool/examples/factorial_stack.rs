//! Using `chunk_pool` as the backing store of a container:
//!
//! * Creating a pool for the element type.
//! * Rebinding it to the container's node type.
//! * Pushing the factorials of 0 to 9 and reading them back.

use std::ptr::NonNull;

use chunk_pool::ChunkPool;

const VALUE_COUNT: u64 = 10;

struct Node<T> {
    value: T,
    below: Option<NonNull<Node<T>>>,
}

/// A last-in, first-out stack whose nodes are allocated from a chunk pool.
struct PooledStack<T, const N: usize> {
    nodes: ChunkPool<Node<T>, N>,
    top: Option<NonNull<Node<T>>>,
}

impl<T, const N: usize> PooledStack<T, N> {
    /// The container is handed a pool for its element type and derives a pool for the node type
    /// it actually allocates.
    fn new_in(pool: &ChunkPool<T, N>) -> Self {
        Self {
            nodes: pool.rebind(),
            top: None,
        }
    }

    fn push(&mut self, value: T) -> Result<(), chunk_pool::Error> {
        let node = self.nodes.allocate()?;

        // SAFETY: Fresh chunk, valid for writes of one node and used by nobody else.
        unsafe {
            node.write(Node {
                value,
                below: self.top,
            });
        }

        self.top = Some(node);
        Ok(())
    }

    fn pop(&mut self) -> Option<T> {
        let node = self.top?;

        // SAFETY: The top node is live and we are unlinking it, so we take ownership of it.
        let Node { value, below } = unsafe { node.read() };
        self.top = below;

        // SAFETY: The node came from our pool and its contents were moved out above.
        unsafe {
            self.nodes.deallocate(node);
        }

        Some(value)
    }
}

impl<T, const N: usize> Drop for PooledStack<T, N> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
    }
}

fn factorial(n: u64) -> u64 {
    (1..=n).product()
}

fn main() -> Result<(), chunk_pool::Error> {
    let pool = ChunkPool::<u64, 10>::new();
    let mut stack = PooledStack::new_in(&pool);

    for n in 0..VALUE_COUNT {
        let value = factorial(n);
        stack.push(value)?;
        println!("{n}! = {value}");
    }

    println!(
        "Node pool holds {} chunks of {} bytes in {} block(s)",
        stack.nodes.len(),
        stack.nodes.chunk_size(),
        stack.nodes.block_count()
    );

    // Popping returns the values in reverse and hands each node back to the pool.
    while let Some(value) = stack.pop() {
        println!("Popped {value}");
    }

    // The next push reuses the most recently freed node instead of growing the pool.
    stack.push(factorial(VALUE_COUNT))?;

    println!(
        "After refilling, the node pool still has {} block(s)",
        stack.nodes.block_count()
    );

    Ok(())
}
