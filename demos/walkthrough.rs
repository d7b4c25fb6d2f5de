use std::{fmt, ptr::NonNull};

use vsalloc::{ArenaVec, StringBuilder, Table, Vsa, allocator};

/// Dump sink printing straight to stdout.
fn print_line(
  caller: &str,
  args: fmt::Arguments<'_>,
) {
  println!("  [{}] {}", caller, args);
}

fn main() {
  // 512 bytes, word aligned by construction.
  let mut memory = [0u64; 64];
  let bytes = unsafe { std::slice::from_raw_parts_mut(memory.as_mut_ptr().cast::<u8>(), 512) };
  let mut vsa = Vsa::new(bytes).expect("512 bytes hold an arena");

  vsa.dump(print_line, "start");

  unsafe {
    // --------------------------------------------------------------------
    // 1) Allocate a u32. Requests are rounded up to a whole word.
    // --------------------------------------------------------------------
    let first = vsa.alloc(size_of::<u32>()).unwrap();
    first.cast::<u32>().write(0xDEADBEEF);
    println!("\n[1] alloc(4) = {:p}, usable size {}", first, vsa.usable_size(first).unwrap());
    println!("[1] value = 0x{:X}", first.cast::<u32>().read());

    // --------------------------------------------------------------------
    // 2) Allocate 12 bytes, zeroed.
    // --------------------------------------------------------------------
    let second = vsa.calloc(12, 1).unwrap();
    println!("\n[2] calloc(12, 1) = {:p}", second);

    // --------------------------------------------------------------------
    // 3) Allocate a u64 and check its alignment.
    // --------------------------------------------------------------------
    let third = vsa.alloc(size_of::<u64>()).unwrap();
    third.cast::<u64>().write(0x1122334455667788);
    println!(
      "\n[3] alloc(8) = {:p}, addr % 8 = {}",
      third,
      third.as_ptr() as usize % 8
    );

    vsa.dump(print_line, "after three allocations");

    // --------------------------------------------------------------------
    // 4) Free the first two blocks. They stay separate until a search
    //    walks over them.
    // --------------------------------------------------------------------
    vsa.free(Some(first)).unwrap();
    vsa.free(Some(second)).unwrap();
    vsa.dump(print_line, "after two frees");

    // --------------------------------------------------------------------
    // 5) A 24 byte request fits neither hole alone; the search merges them.
    // --------------------------------------------------------------------
    let merged = vsa.alloc(24).unwrap();
    println!(
      "\n[5] alloc(24) = {:p}, reused first block? {}",
      merged,
      merged == first
    );
    vsa.dump(print_line, "after merge");

    // --------------------------------------------------------------------
    // 6) Grow the u64 block. Its contents move with it.
    // --------------------------------------------------------------------
    let grown = vsa.realloc(Some(third), 64).unwrap().map(NonNull::cast::<u64>);
    if let Some(grown) = grown {
      println!("\n[6] realloc(.., 64) = {:p}, value = 0x{:X}", grown, grown.read());
    }

    // --------------------------------------------------------------------
    // 7) Mistakes are reported, not acted on.
    // --------------------------------------------------------------------
    println!("\n[7] double free: {:?}", vsa.free(Some(third)));
    println!("[7] oversized: {:?}", vsa.alloc(4096));
  }

  vsa.dump(print_line, "end");

  // ------------------------------------------------------------------------
  // 8) The process-wide allocator and the containers built on it.
  // ------------------------------------------------------------------------
  if !allocator::init(64 * 1024) {
    return;
  }

  {
    let mut squares = ArenaVec::new().unwrap();
    for n in 1..=20u32 {
      squares.push(n * n).unwrap();
    }

    let mut names = Table::new();
    names.insert("one", 1).unwrap();
    names.insert("two", 2).unwrap();

    let mut greeting = StringBuilder::new().unwrap();
    greeting.push_str("Hello, World!").unwrap();

    println!("\n[8] squares = {:?}", squares);
    println!("[8] names = {:?}", names);
    println!("[8] greeting = {:?}", greeting.as_c_str());
  }

  println!("[8] stats = {:?}", allocator::stats());
  allocator::finalize();
}
