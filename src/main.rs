fn main() {
    retext::cli::run();
}
