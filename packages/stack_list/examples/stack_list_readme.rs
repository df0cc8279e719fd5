//! Example that demonstrates the typical usage of `StackList` in a hot loop.
//!
//! Each iteration collects a few values into a list backed by the stack of the current
//! function. Only iterations that collect more values than fit on the stack touch the pool.

use buffer_pool::BufferPool;
use stack_list::{StackList, uninit_buffer};

fn collect_multiples(limit: u32, factor: u32) -> u32 {
    let mut buffer = uninit_buffer::<u32, 8>();
    let mut multiples = StackList::from_borrowed(&mut buffer);

    for value in 1..=limit {
        if value % factor == 0 {
            multiples.push(value);
        }
    }

    multiples.iter().sum()
}

fn main() {
    let mut total: u32 = 0;

    for limit in 0..100 {
        total = total.wrapping_add(collect_multiples(limit, 3));
    }

    println!("Sum of all collected multiples: {total}");

    let stats = BufferPool::shared().stats();
    println!(
        "Pool activity: {} rented, {} freshly allocated, {} retained",
        stats.rented(),
        stats.allocated(),
        stats.retained()
    );
}
