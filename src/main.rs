fn main() {
    println!("🚨 Main binary moved to API server!");
    println!("To start the system, run:");
    println!("   cargo run -p api_server");
    println!();
    println!("The API server provides wallet holdings aggregation:");
    println!("   • POST /api/balances - scan a wallet across all supported chains");
    println!("   • GET /api/native-token-metadata?chainId=N - native token metadata");
    println!("   • GET /health - health probe");
    println!();
    println!("See README or API documentation for endpoint details.");
}
