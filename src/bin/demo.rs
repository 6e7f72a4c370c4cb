//! Voltage MC Demo
//!
//! Demonstrates the voltage_mc library features including:
//! - Frame construction for the 1E/3E/4E binary dialects (no connection required)
//! - Fixed-layout struct marshalling with packed booleans and ASCII strings
//! - MC TCP client operations (read/write words, bits and structs)
//!
//! Usage: cargo run --bin demo [plc_address]
//! Example: cargo run --bin demo 192.168.3.39:6000

use tokio::time::sleep;
use voltage_mc::{
    CommandBuilder, DeviceType, Field, FieldValue, FrameVariant, McConfig, McTcpClient,
    StructSchema,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🚀 Voltage MC Demo");
    println!("==================");
    println!("MELSEC Communication Protocol Showcase\n");

    // =========================================================================
    // Part 1: Frame Construction Demo (No connection required)
    // =========================================================================
    println!("📦 Part 1: Frame Construction (1E / 3E / 4E)");
    println!("---------------------------------------------");

    for variant in [FrameVariant::Mc1E, FrameVariant::Mc3E, FrameVariant::Mc4E] {
        let command = CommandBuilder::new(variant).build_read(DeviceType::D, 100, 4);
        let hex: Vec<String> = command.bytes.iter().map(|b| format!("{:02X}", b)).collect();
        println!(
            "  {} read D100 x4 -> {} bytes: {}",
            variant,
            command.bytes.len(),
            hex.join(" ")
        );
        println!("    minimum response length: {}", command.min_response_len);
    }

    // =========================================================================
    // Part 2: Device Addressing Demo
    // =========================================================================
    println!("\n🔢 Part 2: Device Addressing");
    println!("-----------------------------");

    for name in ["D", "M", "X", "Y", "W", "ZR"] {
        let device: DeviceType = name.parse()?;
        println!(
            "  {} -> code 0x{:02X}, {} notation",
            device,
            device.code(),
            if device.is_hex_addressed() {
                "hexadecimal"
            } else {
                "decimal"
            }
        );
    }

    // =========================================================================
    // Part 3: Struct Marshalling Demo
    // =========================================================================
    println!("\n📊 Part 3: Struct Marshalling");
    println!("------------------------------");

    let schema = StructSchema::new(vec![
        Field::bool("running"),
        Field::bool("fault"),
        Field::bool("manual"),
        Field::i16("speed"),
        Field::f32("temperature"),
        Field::string("batch_id", 8),
    ]);
    println!(
        "  Schema: 3 bools + i16 + f32 + str[8] -> {} bytes ({} registers)",
        schema.size_of()?,
        schema.register_count()?
    );

    let values = vec![
        FieldValue::Bool(true),
        FieldValue::Bool(false),
        FieldValue::Bool(true),
        FieldValue::I16(1500),
        FieldValue::F32(68.4),
        FieldValue::Str("LOT-0042".to_string()),
    ];
    let encoded = schema.encode(&values)?;
    let hex: Vec<String> = encoded.iter().map(|b| format!("{:02X}", b)).collect();
    println!("  Encoded: {}", hex.join(" "));

    let decoded = schema.decode(&encoded)?;
    println!("  Decoded: {:?}", decoded);

    // =========================================================================
    // Part 4: TCP Client Demo (requires a PLC or simulator)
    // =========================================================================
    println!("\n🔌 Part 4: TCP Client Operations");
    println!("---------------------------------");

    let plc_address = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:5007".to_string());
    let (ip, port) = plc_address
        .rsplit_once(':')
        .ok_or("Address must be host:port")?;

    println!("  Connecting to {}...", plc_address);

    let config = McConfig::new(ip, port.parse()?, FrameVariant::Mc3E);
    let mut client = McTcpClient::new(config)?;

    if let Err(e) = client.connect().await {
        println!("  ⚠️  Connection failed: {}", e);
        println!("  (This is expected if no PLC or simulator is running)");
        println!("\n🎉 Demo completed! (TCP operations skipped)");
        return Ok(());
    }
    println!("  ✅ Connected successfully!");

    println!("\n  📖 Read Operations:");

    match client.read_words::<i16>(DeviceType::D, 100, 5).await {
        Ok(words) => println!("    D100-D104: {:?}", words),
        Err(e) => println!("    Read error: {}", e),
    }

    sleep(std::time::Duration::from_millis(50)).await;

    match client.read_bits(DeviceType::M, 0, 8).await {
        Ok(bits) => {
            let states: Vec<&str> = bits.iter().map(|&b| if b { "ON" } else { "OFF" }).collect();
            println!("    M0-M7: {:?}", states);
        }
        Err(e) => println!("    Read error: {}", e),
    }

    println!("\n  ✏️  Write Operations:");

    match client.write_words(DeviceType::D, 200, &[0x1234i16]).await {
        Ok(_) => println!("    Wrote D200 = 0x1234"),
        Err(e) => println!("    Write error: {}", e),
    }

    sleep(std::time::Duration::from_millis(50)).await;

    match client.write_words(DeviceType::D, 210, &[98.6f32]).await {
        Ok(_) => println!("    Wrote F32 98.6 to D210-D211"),
        Err(e) => println!("    Write error: {}", e),
    }

    let stats = client.get_stats();
    println!("\n  📊 Statistics:");
    println!(
        "    Requests: {}, Responses: {}",
        stats.requests_sent, stats.responses_received
    );
    println!(
        "    Bytes sent: {}, received: {}",
        stats.bytes_sent, stats.bytes_received
    );

    if let Err(e) = client.close().await {
        eprintln!("  ⚠️  Close error: {}", e);
    }

    println!("\n🎉 Demo completed!");
    println!("📚 Documentation: https://docs.rs/voltage_mc");
    println!("🔗 Repository: https://github.com/EvanL1/voltage_mc");

    Ok(())
}
