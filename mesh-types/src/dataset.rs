//! Thread operational dataset, encoded as the TLV hex string `ot-ctl dataset set active`
//! accepts.

use crate::error::MeshError;

const TLV_CHANNEL: u8 = 0x00;
const TLV_PAN_ID: u8 = 0x01;
const TLV_EXT_PAN_ID: u8 = 0x02;
const TLV_NETWORK_NAME: u8 = 0x03;
const TLV_PSKC: u8 = 0x04;
const TLV_NETWORK_KEY: u8 = 0x05;
const TLV_MESH_LOCAL_PREFIX: u8 = 0x07;
const TLV_SECURITY_POLICY: u8 = 0x0c;
const TLV_ACTIVE_TIMESTAMP: u8 = 0x0e;
const TLV_CHANNEL_MASK: u8 = 0x35;

/// Maximum network name length in bytes.
const MAX_NETWORK_NAME: usize = 16;

/// Active operational dataset for forming a Thread network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadDataset {
    /// Active timestamp (seconds and ticks packed as on the wire).
    pub active_timestamp: u64,
    /// Channel page 0 channel.
    pub channel: u16,
    /// Raw channel mask entries.
    pub channel_mask: Vec<u8>,
    /// Extended PAN id.
    pub ext_pan_id: [u8; 8],
    /// Mesh-local prefix (first 8 bytes of the /64).
    pub mesh_local_prefix: [u8; 8],
    /// Network master key.
    pub network_key: [u8; 16],
    /// Network name.
    pub network_name: String,
    /// PAN id.
    pub pan_id: u16,
    /// Pre-shared key for commissioner.
    pub pskc: [u8; 16],
    /// Key rotation time in hours.
    pub key_rotation_hours: u16,
    /// Security policy flags.
    pub security_flags: u16,
}

impl Default for ThreadDataset {
    /// The dataset the reference test environment forms its network with.
    fn default() -> Self {
        Self {
            active_timestamp: 0x0000_0000_0001_0000,
            channel: 12,
            channel_mask: vec![0x00, 0x04, 0x00, 0x1f, 0xff, 0xe0],
            ext_pan_id: [0xfe, 0xdc, 0xba, 0x98, 0x76, 0x54, 0x32, 0x10],
            mesh_local_prefix: [0xfd, 0x00, 0x00, 0x00, 0x00, 0x00, 0x12, 0x34],
            network_key: [
                0xff, 0xee, 0xdd, 0xcc, 0xbb, 0xaa, 0x99, 0x88, 0x77, 0x66, 0x55, 0x44, 0x33,
                0x22, 0x11, 0x00,
            ],
            network_name: "OpenThreadDemo".into(),
            pan_id: 0x12aa,
            pskc: [
                0xb9, 0x1d, 0x1f, 0x2b, 0x7d, 0x2d, 0x9d, 0x1e, 0x1b, 0xb3, 0xd7, 0xda, 0x8a,
                0x7f, 0x5b, 0x9e,
            ],
            key_rotation_hours: 672,
            security_flags: 0xfff8,
        }
    }
}

impl ThreadDataset {
    /// Override the extended PAN id.
    pub fn ext_pan_id(mut self, ext_pan_id: [u8; 8]) -> Self {
        self.ext_pan_id = ext_pan_id;
        self
    }

    /// Override the channel.
    pub fn channel(mut self, channel: u16) -> Self {
        self.channel = channel;
        self
    }

    /// Override the network name.
    pub fn network_name(mut self, name: &str) -> Self {
        self.network_name = name.into();
        self
    }

    /// Encode as a lowercase hex TLV string.
    pub fn to_tlv_hex(&self) -> Result<String, MeshError> {
        if self.network_name.is_empty() || self.network_name.len() > MAX_NETWORK_NAME {
            return Err(MeshError::InvalidDataset(format!(
                "network name must be 1-{} bytes, got {}",
                MAX_NETWORK_NAME,
                self.network_name.len()
            )));
        }
        if self.channel_mask.len() > u8::MAX as usize {
            return Err(MeshError::InvalidDataset("channel mask too long".into()));
        }

        let mut tlvs = Vec::with_capacity(128);
        push_tlv(&mut tlvs, TLV_ACTIVE_TIMESTAMP, &self.active_timestamp.to_be_bytes());

        let mut channel = vec![0u8];
        channel.extend_from_slice(&self.channel.to_be_bytes());
        push_tlv(&mut tlvs, TLV_CHANNEL, &channel);

        push_tlv(&mut tlvs, TLV_CHANNEL_MASK, &self.channel_mask);
        push_tlv(&mut tlvs, TLV_EXT_PAN_ID, &self.ext_pan_id);
        push_tlv(&mut tlvs, TLV_MESH_LOCAL_PREFIX, &self.mesh_local_prefix);
        push_tlv(&mut tlvs, TLV_NETWORK_KEY, &self.network_key);
        push_tlv(&mut tlvs, TLV_NETWORK_NAME, self.network_name.as_bytes());
        push_tlv(&mut tlvs, TLV_PAN_ID, &self.pan_id.to_be_bytes());
        push_tlv(&mut tlvs, TLV_PSKC, &self.pskc);

        let mut policy = self.key_rotation_hours.to_be_bytes().to_vec();
        policy.extend_from_slice(&self.security_flags.to_be_bytes());
        push_tlv(&mut tlvs, TLV_SECURITY_POLICY, &policy);

        Ok(hex::encode(tlvs))
    }
}

fn push_tlv(buf: &mut Vec<u8>, tlv_type: u8, value: &[u8]) {
    buf.push(tlv_type);
    buf.push(value.len() as u8);
    buf.extend_from_slice(value);
}
