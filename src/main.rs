fn main() {
    if let Err(err) = presto_lib::run() {
        eprintln!("presto: {err:?}");
        std::process::exit(1);
    }
}
