use nalgebra as na;
use serde::Serialize;

/// Every marker is an x and a y double
pub const MARKER_RECORD_SIZE: usize = 16;

/// Byte order the consumer expects. It reads doubles in its host order.
pub const WIRE_BYTE_ORDER: ByteOrder = ByteOrder::Native;

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum ByteOrder {
    #[cfg_attr(not(test), allow(dead_code))]
    Little,
    #[cfg_attr(not(test), allow(dead_code))]
    Big,
    Native,
}

impl ByteOrder {
    fn write(self, value: f64, buffer: &mut Vec<u8>) {
        let bytes = match self {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
            ByteOrder::Native => value.to_ne_bytes(),
        };
        buffer.extend_from_slice(&bytes);
    }
}

/// Unlabeled marker projected onto the floor plane
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    index: usize,
    position: na::Point2<f64>,
}

impl Marker {
    /// Builds a marker from a capture position in millimeters.
    /// Height is dropped and coordinates are kept to millimeter precision.
    pub fn from_millimeters(index: usize, position: &na::Point3<f64>) -> Self {
        Self {
            index,
            position: na::Point2::new(
                millimeters_to_meters(position.x),
                millimeters_to_meters(position.y),
            ),
        }
    }
}

fn millimeters_to_meters(value: f64) -> f64 {
    let meters = value / 1000.;
    (meters * 1000.).round_ties_even() / 1000.
}

/// Snapshot of one outgoing frame, only used for logging
#[derive(Debug, Serialize)]
pub struct MarkerFrame<'a> {
    ts: u128,
    markers: &'a [Marker],
}

impl<'a> MarkerFrame<'a> {
    pub fn new(ts: u128, markers: &'a [Marker]) -> Self {
        Self { ts, markers }
    }
}

/// Packs markers back to back as `x y` doubles. There is no header,
/// the receiver derives the marker count from the length.
pub fn encode_markers(markers: &[Marker], order: ByteOrder) -> Vec<u8> {
    let mut message = Vec::with_capacity(markers.len() * MARKER_RECORD_SIZE);
    for marker in markers {
        order.write(marker.position.x, &mut message);
        order.write(marker.position.y, &mut message);
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Same parsing rule as the consumer: whole records only
    fn decode_markers(message: &[u8], order: ByteOrder) -> Option<Vec<na::Point2<f64>>> {
        if message.len() % MARKER_RECORD_SIZE != 0 {
            return None;
        }
        let read = |bytes: &[u8]| {
            let mut buffer = [0_u8; 8];
            buffer.copy_from_slice(bytes);
            match order {
                ByteOrder::Little => f64::from_le_bytes(buffer),
                ByteOrder::Big => f64::from_be_bytes(buffer),
                ByteOrder::Native => f64::from_ne_bytes(buffer),
            }
        };
        Some(
            message
                .chunks_exact(MARKER_RECORD_SIZE)
                .map(|record| na::Point2::new(read(&record[..8]), read(&record[8..])))
                .collect(),
        )
    }

    fn marker(index: usize, x: f64, y: f64) -> Marker {
        Marker::from_millimeters(index, &na::Point3::new(x, y, 42.))
    }

    #[test]
    fn test_message_length_follows_marker_count() {
        for count in [0, 1, 2, 17, 200] {
            let markers: Vec<_> = (0..count).map(|i| marker(i, i as f64, 0.)).collect();
            let message = encode_markers(&markers, WIRE_BYTE_ORDER);
            assert_eq!(message.len(), 16 * count);
        }
    }

    #[test]
    fn test_two_markers_layout() {
        let markers = vec![marker(0, 1000., 2000.), marker(1, -500.4, 0.)];
        let message = encode_markers(&markers, ByteOrder::Native);
        assert_eq!(message.len(), 32);
        let values: Vec<f64> = message
            .chunks_exact(8)
            .map(|chunk| {
                let mut bytes = [0_u8; 8];
                bytes.copy_from_slice(chunk);
                f64::from_ne_bytes(bytes)
            })
            .collect();
        assert_eq!(values, vec![1.0, 2.0, -0.5, 0.0]);
    }

    #[test]
    fn test_rounds_to_millimeter() {
        let decoded = decode_markers(
            &encode_markers(&[marker(0, 1234.56, -987.44)], ByteOrder::Little),
            ByteOrder::Little,
        )
        .unwrap();
        assert!((decoded[0].x - 1.235).abs() < 1e-12);
        assert!((decoded[0].y + 0.987).abs() < 1e-12);
    }

    #[test]
    fn test_big_endian_record() {
        let message = encode_markers(&[marker(0, 1000., 0.)], ByteOrder::Big);
        assert_eq!(&message[..8], &1.0_f64.to_be_bytes());
        assert_eq!(&message[8..], &0.0_f64.to_be_bytes());
    }

    #[test]
    fn test_native_order_round_trip() {
        let markers = vec![marker(0, 10., 20.), marker(1, -30., 40.)];
        let message = encode_markers(&markers, WIRE_BYTE_ORDER);
        let decoded = decode_markers(&message, WIRE_BYTE_ORDER).unwrap();
        assert_eq!(decoded, vec![markers[0].position, markers[1].position]);
        assert!(decode_markers(&[0; 20], WIRE_BYTE_ORDER).is_none());
    }

    #[test]
    fn test_frame_json() {
        let markers = vec![marker(3, 1500., 250.)];
        let json = serde_json::to_value(MarkerFrame::new(7, &markers)).unwrap();
        assert_eq!(json["ts"], 7);
        assert_eq!(json["markers"][0]["index"], 3);
    }
}
