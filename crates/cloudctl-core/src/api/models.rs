//! Wire models for the storage and compute endpoints

use serde::{Deserialize, Serialize};

use crate::attachment::{AttachmentMode, AttachmentRecord, AttachmentType};
use crate::operation::Operation;

/// A block storage disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disk {
    pub id: String,
    pub name: String,
    pub location: String,
    #[serde(rename = "type")]
    pub disk_type: String,
    /// Size as reported by the API, e.g. `200GiB`
    pub size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub block_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Body of `POST /projects/{p}/storage/disks`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiskCreateRequest {
    pub name: String,
    pub location: String,
    #[serde(rename = "type")]
    pub disk_type: String,
    pub size: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_size: Option<u64>,
}

/// Body of `PATCH /projects/{p}/storage/disks/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiskResizeRequest {
    pub size: String,
}

/// A VM instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub project_id: String,
    pub location: String,
    #[serde(rename = "type")]
    pub instance_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default)]
    pub disks: Vec<InstanceDisk>,
    #[serde(default)]
    pub network_interfaces: Vec<NetworkInterface>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_id: Option<String>,
    #[serde(default)]
    pub host_channel_adapters: Vec<HostChannelAdapter>,
}

impl Instance {
    /// Name the instance resolves to inside its network
    pub fn internal_dns_name(&self) -> String {
        format!("{}.{}.compute.internal", self.name, self.location)
    }

    /// Public DNS name, taken from the first network interface
    pub fn external_dns_name(&self) -> Option<&str> {
        self.network_interfaces
            .first()
            .and_then(|nic| nic.external_dns_name.as_deref())
            .filter(|name| !name.is_empty())
    }

    /// InfiniBand partition of the first host channel adapter
    pub fn ib_partition_id(&self) -> Option<&str> {
        self.host_channel_adapters
            .first()
            .map(|hca| hca.ib_partition_id.as_str())
    }

    /// Interfaces the API returned without any IP address
    pub fn interfaces_missing_ips(&self) -> impl Iterator<Item = &NetworkInterface> {
        self.network_interfaces.iter().filter(|nic| nic.ips.is_empty())
    }
}

/// A network interface of an instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterface {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub subnet: String,
    #[serde(default)]
    pub interface_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_dns_name: Option<String>,
    #[serde(default)]
    pub ips: Vec<InterfaceIps>,
}

impl NetworkInterface {
    /// Private address of the primary IP set
    pub fn private_ipv4(&self) -> Option<&str> {
        self.ips
            .first()
            .and_then(|ips| ips.private_ipv4.as_ref())
            .map(|ip| ip.address.as_str())
    }

    /// Public address of the primary IP set
    pub fn public_ipv4(&self) -> Option<&str> {
        self.ips
            .first()
            .and_then(|ips| ips.public_ipv4.as_ref())
            .map(|ip| ip.address.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceIps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_ipv4: Option<PrivateIpv4>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ipv4: Option<PublicIpv4>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateIpv4 {
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicIpv4 {
    #[serde(default)]
    pub id: String,
    pub address: String,
    /// `static` or `dynamic`
    #[serde(default, rename = "type")]
    pub ip_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostChannelAdapter {
    pub ib_partition_id: String,
}

/// A disk as listed on an instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceDisk {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub attachment_type: AttachmentType,
    pub mode: AttachmentMode,
}

impl From<&InstanceDisk> for AttachmentRecord {
    fn from(disk: &InstanceDisk) -> Self {
        AttachmentRecord {
            id: disk.id.clone(),
            attachment_type: disk.attachment_type,
            mode: disk.mode,
        }
    }
}

/// One entry of an attach request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct DiskAttachment {
    pub disk_id: String,
    pub attachment_type: AttachmentType,
    pub mode: AttachmentMode,
}

impl From<&AttachmentRecord> for DiskAttachment {
    fn from(record: &AttachmentRecord) -> Self {
        Self {
            disk_id: record.id.clone(),
            attachment_type: record.attachment_type,
            mode: record.mode,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AttachDisksRequest {
    pub attach_disks: Vec<DiskAttachment>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DetachDisksRequest {
    pub detach_disks: Vec<String>,
}

/// Envelope of every mutating call
#[derive(Debug, Deserialize)]
pub(crate) struct OperationResponse {
    pub operation: Operation,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_disk_tolerates_missing_optional_fields() {
        let disk: Disk = serde_json::from_value(json!({
            "id": "d-1",
            "name": "scratch",
            "location": "us-east1-a",
            "type": "shared-volume",
            "size": "1TiB"
        }))
        .unwrap();

        assert_eq!(disk.disk_type, "shared-volume");
        assert_eq!(disk.block_size, 0);
        assert!(disk.serial_number.is_none());
    }

    #[test]
    fn test_create_request_omits_unset_block_size() {
        let request = DiskCreateRequest {
            name: "data".to_string(),
            location: "us-east1-a".to_string(),
            disk_type: "shared-volume".to_string(),
            size: "10TiB".to_string(),
            block_size: None,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["type"], "shared-volume");
        assert!(json.get("block_size").is_none());
    }

    #[test]
    fn test_attach_request_wire_shape() {
        let record = AttachmentRecord::data("d-1", AttachmentMode::ReadOnly);
        let body = AttachDisksRequest {
            attach_disks: vec![DiskAttachment::from(&record)],
        };

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"attach_disks": [
                {"disk_id": "d-1", "attachment_type": "data", "mode": "read-only"}
            ]})
        );
    }

    #[test]
    fn test_instance_disks_convert_to_records() {
        let instance: Instance = serde_json::from_value(json!({
            "id": "vm-1",
            "name": "trainer",
            "location": "us-east1-a",
            "type": "a100.8x",
            "disks": [
                {"id": "boot", "attachment_type": "os", "mode": "read-write"},
                {"id": "d-1", "attachment_type": "data", "mode": "read-only"}
            ]
        }))
        .unwrap();

        let records: Vec<AttachmentRecord> = instance.disks.iter().map(Into::into).collect();
        assert_eq!(records[0].attachment_type, AttachmentType::Os);
        assert_eq!(
            records[1],
            AttachmentRecord::data("d-1", AttachmentMode::ReadOnly)
        );
    }

    #[test]
    fn test_instance_network_fields() {
        let instance: Instance = serde_json::from_value(json!({
            "id": "vm-1",
            "name": "trainer",
            "location": "us-east1-a",
            "type": "a100.8x",
            "reservation_id": "res-7",
            "host_channel_adapters": [{"ib_partition_id": "ib-1"}],
            "network_interfaces": [{
                "id": "nic-1",
                "name": "eth0",
                "network": "net-1",
                "subnet": "subnet-1",
                "interface_type": "gvnic",
                "external_dns_name": "trainer.example.cloud",
                "ips": [{
                    "private_ipv4": {"address": "10.0.0.4"},
                    "public_ipv4": {"id": "ip-1", "address": "203.0.113.9", "type": "static"}
                }]
            }]
        }))
        .unwrap();

        assert_eq!(instance.internal_dns_name(), "trainer.us-east1-a.compute.internal");
        assert_eq!(instance.external_dns_name(), Some("trainer.example.cloud"));
        assert_eq!(instance.reservation_id.as_deref(), Some("res-7"));
        assert_eq!(instance.ib_partition_id(), Some("ib-1"));

        let nic = &instance.network_interfaces[0];
        assert_eq!(nic.private_ipv4(), Some("10.0.0.4"));
        assert_eq!(nic.public_ipv4(), Some("203.0.113.9"));
        assert_eq!(nic.ips[0].public_ipv4.as_ref().unwrap().ip_type, "static");
        assert_eq!(instance.interfaces_missing_ips().count(), 0);
    }

    #[test]
    fn test_interface_without_ips() {
        let instance: Instance = serde_json::from_value(json!({
            "id": "vm-1",
            "name": "trainer",
            "location": "us-east1-a",
            "type": "a100.8x",
            "network_interfaces": [
                {"name": "eth0", "network": "net-1", "subnet": "subnet-1", "ips": []}
            ]
        }))
        .unwrap();

        let nic = &instance.network_interfaces[0];
        assert_eq!(nic.private_ipv4(), None);
        assert_eq!(nic.public_ipv4(), None);
        assert_eq!(instance.external_dns_name(), None);
        assert_eq!(instance.ib_partition_id(), None);
        let missing: Vec<_> = instance.interfaces_missing_ips().map(|nic| nic.name.as_str()).collect();
        assert_eq!(missing, vec!["eth0"]);
    }
}
