use clap::Parser;
use quad_set::HashSet;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'n', long = "values", default_value_t = 1000)]
    values: u64,

    /// Remove every `stride`-th value after filling, leaving tombstones.
    #[arg(short = 's', long = "remove_stride", default_value_t = 3)]
    remove_stride: u64,
}

fn main() {
    let args = Args::parse();

    println!("Filling set with {} u64 values...", args.values);
    let mut set: HashSet<u64> = HashSet::new();
    for value in 0..args.values {
        set.insert(value);
    }
    println!("{:#?}", set.debug_stats());

    if args.remove_stride > 0 {
        let mut removed = 0;
        for value in (0..args.values).step_by(args.remove_stride as usize) {
            set.remove(&value);
            removed += 1;
        }
        println!("Removed {removed} values");
        println!("{:#?}", set.debug_stats());
    }

    println!("Collision histogram (collisions: values):");
    for (collisions, count) in set.probe_histogram().iter().enumerate() {
        if *count > 0 {
            println!("  {collisions:>3}: {count}");
        }
    }

    let worst = set
        .iter()
        .map(|value| set.collisions(value))
        .max()
        .unwrap_or(0);
    println!("Longest probe: {worst} collisions");
}
