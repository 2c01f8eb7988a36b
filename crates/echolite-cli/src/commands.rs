//! Subcommand implementations

use anyhow::{anyhow, bail, Context, Result};
use colored::Colorize;
use echolite_client::{EchonetClient, EchonetClientBuilder};
use echolite_core::property::{GET_MAP, MAP_CODES};
use echolite_core::{EchonetObject, Identification, Property, PropertyValue};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

use crate::config::CliConfig;

/// Bind the client described by `config`
pub async fn connect(config: &CliConfig) -> Result<EchonetClient> {
    EchonetClientBuilder::from_config(config.client.clone())
        .connect()
        .await
        .context("Failed to start ECHONET Lite client")
}

pub async fn discover(
    config: &CliConfig,
    host: Option<IpAddr>,
    wait_secs: Option<u64>,
    json: bool,
) -> Result<()> {
    let client = connect(config).await?;
    let hosts = discover_hosts(&client, host, wait_secs.unwrap_or(config.discovery.wait_secs)).await?;

    for host in &hosts {
        for object in client.instances(*host) {
            describe_instance(&client, *host, object).await?;
        }
    }

    if json {
        let snapshot = client.snapshot();
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else if hosts.is_empty() {
        println!("{}", "No devices found".yellow());
    } else {
        for host in &hosts {
            print_host(&client, *host);
        }
    }

    client.close();
    Ok(())
}

pub async fn get(config: &CliConfig, host: IpAddr, object: EchonetObject, codes: &[u8]) -> Result<()> {
    let client = connect(config).await?;
    discover_one(&client, host).await?;

    if !client.get(host, object, codes).await? {
        bail!("No response from {} {}", host, object);
    }

    for code in codes {
        let value = client
            .property(host, object, *code)
            .map(|value| format_value(&value))
            .unwrap_or_else(|| "-".dimmed().to_string());
        println!("  0x{:02X} = {}", code, value);
    }

    client.close();
    Ok(())
}

pub async fn set(
    config: &CliConfig,
    host: IpAddr,
    object: EchonetObject,
    properties: Vec<Property>,
) -> Result<()> {
    let client = connect(config).await?;
    discover_one(&client, host).await?;

    let codes: Vec<String> = properties.iter().map(|p| format!("0x{:02X}", p.epc)).collect();
    if !client.set(host, object, properties).await? {
        bail!("No response from {} {}", host, object);
    }

    println!("{} {} {} {}", "OK".green().bold(), host, object, codes.join(" "));
    client.close();
    Ok(())
}

pub async fn monitor(
    config: &CliConfig,
    host: Option<IpAddr>,
    poll_secs: Option<u64>,
    shutdown_rx: &mut mpsc::Receiver<()>,
) -> Result<()> {
    let client = connect(config).await?;
    let hosts = discover_hosts(&client, host, config.discovery.wait_secs).await?;

    let mut watched = Vec::new();
    for host in hosts {
        for object in client.instances(host) {
            describe_instance(&client, host, object).await?;
            let printer = client.clone();
            client.register_update_handler(host, object, move |is_push| {
                let printer = printer.clone();
                async move {
                    print_update(&printer, host, object, is_push);
                    Ok::<(), anyhow::Error>(())
                }
            });
            watched.push((host, object));
        }
    }

    println!(
        "{} Watching {} instance(s), Ctrl+C to stop",
        "echolite".cyan().bold(),
        watched.len()
    );

    let period = Duration::from_secs(poll_secs.unwrap_or(config.discovery.poll_secs).max(1));
    let mut ticker = tokio::time::interval(period);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for (host, object) in &watched {
                    poll_instance(&client, *host, *object).await;
                }
            }
            _ = shutdown_rx.recv() => {
                break;
            }
        }
    }

    client.close();
    println!("{}", "Monitor stopped".yellow());
    Ok(())
}

/// Run discovery and return the hosts that answered
async fn discover_hosts(client: &EchonetClient, host: Option<IpAddr>, wait_secs: u64) -> Result<Vec<IpAddr>> {
    let answered = client.discover(host).await?;

    // Only the first answer to a multicast request is correlated; keep
    // listening for the rest.
    if host.is_none() && wait_secs > 0 {
        tokio::time::sleep(Duration::from_secs(wait_secs)).await;
    } else if !answered {
        warn!("Discovery got no response");
    }

    Ok(client
        .hosts()
        .into_iter()
        .filter(|host| client.is_discovered(*host))
        .collect())
}

async fn discover_one(client: &EchonetClient, host: IpAddr) -> Result<()> {
    if !client.discover(Some(host)).await? || !client.is_discovered(host) {
        bail!("{} did not answer discovery", host);
    }
    Ok(())
}

async fn describe_instance(client: &EchonetClient, host: IpAddr, object: EchonetObject) -> Result<()> {
    if !client.get_all_property_maps(host, object).await? {
        warn!("{} {} did not report its property maps", host, object);
    }
    if !client.get_identification_information(host, object).await? {
        warn!("{} {} did not report identification", host, object);
    }
    Ok(())
}

/// Read every property the instance lists as readable
async fn poll_instance(client: &EchonetClient, host: IpAddr, object: EchonetObject) {
    let codes: Vec<u8> = match client.property(host, object, GET_MAP) {
        Some(PropertyValue::Map(codes)) => codes
            .into_iter()
            .filter(|code| !MAP_CODES.contains(code))
            .collect(),
        _ => return,
    };
    if codes.is_empty() {
        return;
    }

    match client.get(host, object, &codes).await {
        Ok(true) => {}
        Ok(false) => warn!("{} {} did not answer poll", host, object),
        Err(e) => warn!("Poll of {} {} failed: {}", host, object, e),
    }
}

fn print_host(client: &EchonetClient, host: IpAddr) {
    println!("{} {}", "Host".cyan().bold(), host.to_string().bold());
    for object in client.instances(host) {
        println!("  {} {}", "Instance".green(), object);
        if let Some(properties) = client.instance_properties(host, object) {
            print_properties(&properties);
        }
    }
}

fn print_update(client: &EchonetClient, host: IpAddr, object: EchonetObject, is_push: bool) {
    let origin = if is_push { "push" } else { "poll" };
    println!(
        "{} {} {} ({})",
        "UPDATE".yellow().bold(),
        host,
        object,
        origin.dimmed()
    );
    if let Some(properties) = client.instance_properties(host, object) {
        print_properties(&properties);
    }
}

fn print_properties(properties: &BTreeMap<u8, PropertyValue>) {
    for (code, value) in properties {
        println!("    0x{:02X} = {}", code, format_value(value));
    }
}

pub fn format_value(value: &PropertyValue) -> String {
    match value {
        PropertyValue::Map(codes) => {
            let codes: Vec<String> = codes.iter().map(|code| format!("{:02X}", code)).collect();
            format!("[{}]", codes.join(" "))
        }
        PropertyValue::Identification(Identification::DeviceId(id)) => id.clone(),
        PropertyValue::Identification(Identification::Manufacturer(code)) => {
            format!("manufacturer 0x{:06X}", code)
        }
        PropertyValue::Raw(data) => hex::encode(data),
    }
}

/// Parse a property code: `0x80` or `80`
pub fn parse_code(s: &str) -> Result<u8> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u8::from_str_radix(digits, 16).map_err(|_| anyhow!("Invalid property code: {}", s))
}

/// Parse a write argument: `EPC=HEX`, e.g. `0x80=30`
pub fn parse_assignment(s: &str) -> Result<Property> {
    let (code, data) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected EPC=HEX, got: {}", s))?;
    let code = parse_code(code)?;
    let data = hex::decode(data.trim_start_matches("0x"))
        .with_context(|| format!("Invalid data for 0x{:02X}: {}", code, data))?;
    if data.is_empty() {
        bail!("Empty data for 0x{:02X}", code);
    }
    Ok(Property::new(code, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_code() {
        assert_eq!(parse_code("0x80").unwrap(), 0x80);
        assert_eq!(parse_code("b0").unwrap(), 0xB0);
        assert!(parse_code("0x180").is_err());
        assert!(parse_code("zz").is_err());
    }

    #[test]
    fn test_parse_assignment() {
        let property = parse_assignment("0x80=30").unwrap();
        assert_eq!(property, Property::new(0x80, vec![0x30]));

        let property = parse_assignment("B3=0x1a").unwrap();
        assert_eq!(property, Property::new(0xB3, vec![0x1A]));

        assert!(parse_assignment("0x80").is_err());
        assert!(parse_assignment("0x80=").is_err());
        assert!(parse_assignment("0x80=3").is_err());
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&PropertyValue::Raw(vec![0x30, 0x0A].into())), "300a");
        assert_eq!(
            format_value(&PropertyValue::Map([0x80, 0x9F].into_iter().collect())),
            "[80 9F]"
        );
        assert_eq!(
            format_value(&PropertyValue::Identification(Identification::Manufacturer(0x77))),
            "manufacturer 0x000077"
        );
    }
}
