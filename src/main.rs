fn main() {
    pstree::logger::init_logger();
    if let Err(err) = pstree::app::run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
