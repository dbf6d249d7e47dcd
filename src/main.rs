fn main() {
    if let Err(err) = transit_eda::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
