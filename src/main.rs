fn main() {
    if let Err(err) = club_site_lib::run() {
        eprintln!("club-site: {err:#}");
        std::process::exit(1);
    }
}
