#![forbid(unsafe_code)]
pub fn main() {
    zeroscan_cli::run_cli();
}
