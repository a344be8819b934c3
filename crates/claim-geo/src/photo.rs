//! Photo EXIF evidence
//!
//! Reads the GPS position and capture timestamp embedded in an uploaded
//! photo. GPS is stored as degree/minute/second rationals plus a hemisphere
//! reference; the capture time is the IFD0 `DateTime` string
//! (`YYYY:MM:DD HH:MM:SS`).

use crate::{Coordinate, GeoError, Result};
use exif::{Exif, In, Reader, Tag, Value};
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;
use tracing::debug;

/// Location and capture time found in a photo
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExifEvidence {
    pub gps: Option<Coordinate>,
    pub timestamp: Option<String>,
}

/// Extract GPS and timestamp from in-memory image bytes
pub fn extract_exif_data(bytes: &[u8]) -> Result<ExifEvidence> {
    let mut cursor = Cursor::new(bytes);
    let exif = Reader::new()
        .read_from_container(&mut cursor)
        .map_err(|e| GeoError::Exif(e.to_string()))?;
    Ok(evidence_from(&exif))
}

/// Extract GPS and timestamp from an image file
pub fn extract_exif_from_path(path: impl AsRef<Path>) -> Result<ExifEvidence> {
    let file = File::open(path.as_ref())?;
    let mut reader = BufReader::new(file);
    let exif = Reader::new()
        .read_from_container(&mut reader)
        .map_err(|e| GeoError::Exif(e.to_string()))?;
    Ok(evidence_from(&exif))
}

fn evidence_from(exif: &Exif) -> ExifEvidence {
    let gps = gps_coordinate(exif);
    let timestamp = ascii_field(exif, Tag::DateTime);
    debug!(?gps, ?timestamp, "EXIF evidence extracted");
    ExifEvidence { gps, timestamp }
}

fn gps_coordinate(exif: &Exif) -> Option<Coordinate> {
    let lat = dms_field(exif, Tag::GPSLatitude)?;
    let lat_ref = ascii_field(exif, Tag::GPSLatitudeRef)?;
    let lon = dms_field(exif, Tag::GPSLongitude)?;
    let lon_ref = ascii_field(exif, Tag::GPSLongitudeRef)?;

    let lat = if lat_ref == "N" { lat } else { -lat };
    let lon = if lon_ref == "E" { lon } else { -lon };

    match Coordinate::new(lat, lon) {
        Ok(coordinate) => Some(coordinate),
        Err(e) => {
            debug!("Discarding EXIF GPS position: {}", e);
            None
        }
    }
}

/// Degrees + minutes/60 + seconds/3600
fn dms_field(exif: &Exif, tag: Tag) -> Option<f64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match field.value {
        Value::Rational(ref parts) if parts.len() >= 3 => {
            let deg = parts[0].to_f64();
            let min = parts[1].to_f64();
            let sec = parts[2].to_f64();
            let value = deg + min / 60.0 + sec / 3600.0;
            value.is_finite().then_some(value)
        }
        _ => None,
    }
}

fn ascii_field(exif: &Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match field.value {
        Value::Ascii(ref strings) => {
            let raw = strings.first()?;
            let text = String::from_utf8_lossy(raw)
                .trim_end_matches('\0')
                .trim()
                .to_string();
            (!text.is_empty()).then_some(text)
        }
        _ => None,
    }
}

/// Convert an EXIF `YYYY:MM:DD HH:MM:SS` stamp to `YYYY-MM-DDTHH:MM:SS`.
///
/// Anything not in EXIF form is returned unchanged.
pub fn exif_timestamp_to_iso(timestamp: &str) -> String {
    let ts = timestamp.trim();
    let bytes = ts.as_bytes();
    let exif_shaped = bytes.len() == 19
        && bytes[4] == b':'
        && bytes[7] == b':'
        && bytes[10] == b' '
        && bytes[13] == b':'
        && bytes[16] == b':';

    if !exif_shaped {
        return ts.to_string();
    }

    format!("{}-{}-{}T{}", &ts[0..4], &ts[5..7], &ts[8..10], &ts[11..19])
}

/// Hand-built geotagged JPEGs for tests.
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures {
    /// Little-endian TIFF/EXIF block carrying `DateTime` and a GPS position.
    fn tiff_block(lat: f64, lon: f64, timestamp: &str) -> Vec<u8> {
        fn entry(buf: &mut Vec<u8>, tag: u16, kind: u16, count: u32, value: [u8; 4]) {
            buf.extend_from_slice(&tag.to_le_bytes());
            buf.extend_from_slice(&kind.to_le_bytes());
            buf.extend_from_slice(&count.to_le_bytes());
            buf.extend_from_slice(&value);
        }
        fn dms(value: f64) -> Vec<u8> {
            let value = value.abs();
            let deg = value.trunc();
            let min_f = (value - deg) * 60.0;
            let min = min_f.trunc();
            let sec_milli = ((min_f - min) * 60.0 * 1000.0).round();
            let mut out = Vec::with_capacity(24);
            for (num, den) in [(deg as u32, 1u32), (min as u32, 1), (sec_milli as u32, 1000)] {
                out.extend_from_slice(&num.to_le_bytes());
                out.extend_from_slice(&den.to_le_bytes());
            }
            out
        }

        const ASCII: u16 = 2;
        const LONG: u16 = 4;
        const RATIONAL: u16 = 5;

        let mut stamp = timestamp.as_bytes().to_vec();
        stamp.push(0);

        // Layout: header(8) | IFD0 (2 entries) | DateTime | GPS IFD (4 entries) | lat | lon
        let ifd0_offset = 8u32;
        let ifd0_len = 2 + 2 * 12 + 4;
        let stamp_offset = ifd0_offset + ifd0_len;
        let gps_offset = stamp_offset + stamp.len() as u32;
        let gps_len = 2 + 4 * 12 + 4;
        let lat_offset = gps_offset + gps_len;
        let lon_offset = lat_offset + 24;

        let lat_ref = if lat >= 0.0 { b'N' } else { b'S' };
        let lon_ref = if lon >= 0.0 { b'E' } else { b'W' };

        let mut buf = Vec::new();
        buf.extend_from_slice(b"II");
        buf.extend_from_slice(&42u16.to_le_bytes());
        buf.extend_from_slice(&ifd0_offset.to_le_bytes());

        buf.extend_from_slice(&2u16.to_le_bytes());
        entry(&mut buf, 0x0132, ASCII, stamp.len() as u32, stamp_offset.to_le_bytes());
        entry(&mut buf, 0x8825, LONG, 1, gps_offset.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());

        buf.extend_from_slice(&stamp);

        buf.extend_from_slice(&4u16.to_le_bytes());
        entry(&mut buf, 0x0001, ASCII, 2, [lat_ref, 0, 0, 0]);
        entry(&mut buf, 0x0002, RATIONAL, 3, lat_offset.to_le_bytes());
        entry(&mut buf, 0x0003, ASCII, 2, [lon_ref, 0, 0, 0]);
        entry(&mut buf, 0x0004, RATIONAL, 3, lon_offset.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());

        buf.extend_from_slice(&dms(lat));
        buf.extend_from_slice(&dms(lon));
        buf
    }

    /// Minimal JPEG (SOI, APP1 Exif, EOI) geotagged at `lat`/`lon`.
    pub fn geotagged_jpeg(lat: f64, lon: f64, timestamp: &str) -> Vec<u8> {
        let tiff = tiff_block(lat, lon, timestamp);
        let segment_len = (2 + 6 + tiff.len()) as u16;

        let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
        jpeg.extend_from_slice(&segment_len.to_be_bytes());
        jpeg.extend_from_slice(b"Exif\0\0");
        jpeg.extend_from_slice(&tiff);
        jpeg.extend_from_slice(&[0xFF, 0xD9]);
        jpeg
    }

    /// JPEG whose EXIF block has a `DateTime` but no GPS IFD.
    pub fn gpsless_jpeg(timestamp: &str) -> Vec<u8> {
        let mut stamp = timestamp.as_bytes().to_vec();
        stamp.push(0);
        let stamp_offset = 8u32 + 2 + 12 + 4;

        let mut tiff = Vec::new();
        tiff.extend_from_slice(b"II");
        tiff.extend_from_slice(&42u16.to_le_bytes());
        tiff.extend_from_slice(&8u32.to_le_bytes());
        tiff.extend_from_slice(&1u16.to_le_bytes());
        tiff.extend_from_slice(&0x0132u16.to_le_bytes());
        tiff.extend_from_slice(&2u16.to_le_bytes());
        tiff.extend_from_slice(&(stamp.len() as u32).to_le_bytes());
        tiff.extend_from_slice(&stamp_offset.to_le_bytes());
        tiff.extend_from_slice(&0u32.to_le_bytes());
        tiff.extend_from_slice(&stamp);

        let segment_len = (2 + 6 + tiff.len()) as u16;
        let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
        jpeg.extend_from_slice(&segment_len.to_be_bytes());
        jpeg.extend_from_slice(b"Exif\0\0");
        jpeg.extend_from_slice(&tiff);
        jpeg.extend_from_slice(&[0xFF, 0xD9]);
        jpeg
    }

    /// Minimal JPEG with no APP1 segment at all.
    pub fn bare_jpeg() -> Vec<u8> {
        vec![0xFF, 0xD8, 0xFF, 0xD9]
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{bare_jpeg, geotagged_jpeg, gpsless_jpeg};
    use super::*;

    #[test]
    fn test_extract_gps_and_timestamp() {
        let jpeg = geotagged_jpeg(19.0760, 72.8777, "2024:11:07 10:20:30");
        let evidence = extract_exif_data(&jpeg).expect("EXIF should parse");

        let gps = evidence.gps.expect("GPS should be present");
        assert!((gps.latitude - 19.0760).abs() < 1e-4, "lat {}", gps.latitude);
        assert!((gps.longitude - 72.8777).abs() < 1e-4, "lon {}", gps.longitude);
        assert_eq!(evidence.timestamp.as_deref(), Some("2024:11:07 10:20:30"));
    }

    #[test]
    fn test_southern_western_hemispheres_are_negative() {
        let jpeg = geotagged_jpeg(-33.8688, -70.6693, "2024:01:15 08:00:00");
        let gps = extract_exif_data(&jpeg).unwrap().gps.unwrap();
        assert!(gps.latitude < 0.0);
        assert!(gps.longitude < 0.0);
        assert!((gps.latitude + 33.8688).abs() < 1e-4);
    }

    #[test]
    fn test_exif_without_gps() {
        let evidence = extract_exif_data(&gpsless_jpeg("2024:11:07 10:20:30")).unwrap();
        assert!(evidence.gps.is_none());
        assert_eq!(evidence.timestamp.as_deref(), Some("2024:11:07 10:20:30"));
    }

    #[test]
    fn test_image_without_exif_is_an_error() {
        let result = extract_exif_data(&bare_jpeg());
        assert!(matches!(result, Err(GeoError::Exif(_))));
    }

    #[test]
    fn test_exif_timestamp_to_iso() {
        assert_eq!(exif_timestamp_to_iso("2024:11:07 10:20:30"), "2024-11-07T10:20:30");
        assert_eq!(exif_timestamp_to_iso("2024-11-07"), "2024-11-07");
        assert_eq!(exif_timestamp_to_iso("garbage"), "garbage");
    }
}
