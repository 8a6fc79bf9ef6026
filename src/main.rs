fn main() {
    std::process::exit(hikari_downloader_lib::run())
}
