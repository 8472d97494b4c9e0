fn main() -> Result<(), Box<dyn std::error::Error>> {
    heartline::cli::main()
}
