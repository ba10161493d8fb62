//! Test data generators for input records.

use vmbatch_core::{NetworkSettings, ProvisionRequest};

/// One well-formed CSV record for `name` built from `template`
///
/// The host part of the IP is derived from the name length so records stay
/// distinguishable without any bookkeeping.
pub fn csv_record(name: &str, template: &str) -> String {
    format!(
        "{name},{template},prod,standard,eth0,10.0.0.{host},10.0.0.1,255.255.255.0,10.0.0.2,10.0.0.3,10.0.0.4,2,1,4294967296,2147483648,21474836480",
        name = name,
        template = template,
        host = 10 + name.len(),
    )
}

/// A newline-terminated CSV document with one record per name
pub fn csv_batch(names: &[&str], template: &str) -> String {
    names
        .iter()
        .map(|name| format!("{}\n", csv_record(name, template)))
        .collect()
}

/// Names `vm-000` .. `vm-<count-1>`
pub fn vm_names(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("vm-{:03}", i)).collect()
}

/// A request equivalent to what the parser yields for [`csv_record`]
pub fn request(name: &str, template: &str) -> ProvisionRequest {
    ProvisionRequest {
        name: name.to_string(),
        template: template.to_string(),
        cluster: "prod".to_string(),
        class: "standard".to_string(),
        network: NetworkSettings {
            nic: "eth0".to_string(),
            ip: format!("10.0.0.{}", 10 + name.len()),
            gateway: "10.0.0.1".to_string(),
            mask: "255.255.255.0".to_string(),
            dns: [
                "10.0.0.2".to_string(),
                "10.0.0.3".to_string(),
                "10.0.0.4".to_string(),
            ],
        },
        cpu_cores: 2,
        cpu_sockets: 1,
        memory_bytes: 4_294_967_296,
        memory_guaranteed_bytes: 2_147_483_648,
        disk_size_bytes: 21_474_836_480,
    }
}
