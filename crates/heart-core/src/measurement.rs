//! Decoder for the Bluetooth Heart Rate Measurement characteristic (0x2A37).
//!
//! Layout: one flags byte, then the heart-rate value (u8, or u16 LE when flag
//! bit 0 is set), then an optional u16 energy-expended field (bit 3), then
//! zero or more u16 RR intervals in 1/1024 s (bit 4).

use std::time::Duration;

use thiserror::Error;

const FLAG_VALUE_U16: u8 = 0x01;
const FLAG_CONTACT_DETECTED: u8 = 0x02;
const FLAG_CONTACT_SUPPORTED: u8 = 0x04;
const FLAG_ENERGY_PRESENT: u8 = 0x08;
const FLAG_RR_PRESENT: u8 = 0x10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeasurementError {
    #[error("packet has {0} bytes, need at least 2")]
    Truncated(usize),
}

/// Skin contact state reported in flag bits 1-2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorContact {
    NotSupported,
    NotDetected,
    Detected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeartRateMeasurement {
    pub bpm: u16,
    pub contact: SensorContact,
    /// Cumulative energy in kJ, when the sensor reports it.
    pub energy_expended: Option<u16>,
    pub rr_intervals: Vec<Duration>,
}

impl HeartRateMeasurement {
    pub fn parse(data: &[u8]) -> Result<Self, MeasurementError> {
        if data.len() < 2 {
            return Err(MeasurementError::Truncated(data.len()));
        }
        let flags = data[0];

        // A 16-bit flag on a 2-byte packet falls back to the 8-bit value.
        let (bpm, mut offset) = if flags & FLAG_VALUE_U16 != 0 && data.len() >= 3 {
            (u16::from_le_bytes([data[1], data[2]]), 3)
        } else {
            (data[1] as u16, 2)
        };

        let contact = if flags & FLAG_CONTACT_SUPPORTED == 0 {
            SensorContact::NotSupported
        } else if flags & FLAG_CONTACT_DETECTED != 0 {
            SensorContact::Detected
        } else {
            SensorContact::NotDetected
        };

        let mut energy_expended = None;
        if flags & FLAG_ENERGY_PRESENT != 0 {
            if let Some(bytes) = data.get(offset..offset + 2) {
                energy_expended = Some(u16::from_le_bytes([bytes[0], bytes[1]]));
            }
            offset += 2;
        }

        let mut rr_intervals = Vec::new();
        if flags & FLAG_RR_PRESENT != 0 {
            if let Some(rest) = data.get(offset..) {
                // trailing odd byte is ignored
                for pair in rest.chunks_exact(2) {
                    let ticks = u16::from_le_bytes([pair[0], pair[1]]);
                    rr_intervals.push(Duration::from_secs_f64(ticks as f64 / 1024.0));
                }
            }
        }

        Ok(Self {
            bpm,
            contact,
            energy_expended,
            rr_intervals,
        })
    }
}
