/// Display version information
pub fn execute() {
    println!("queuekeeper {}", env!("CARGO_PKG_VERSION"));
    println!("Walk-in service queue bot");
}
