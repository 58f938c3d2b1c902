//! Intel HEX images, as written by avr-objcopy (firmware) and avrdude
//! (EEPROM dumps).

use anyhow::{bail, Context, Result};
use tasta_core::calibration::{EEPROM_ADDR, NO_CALIBRATION};

/// ATtiny85 program memory.
pub const FLASH_SIZE: u32 = 8192;

/// ATtiny85 EEPROM.
pub const EEPROM_SIZE: u32 = 512;

/// A contiguous run of bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub address: u32,
    pub data: Vec<u8>,
}

impl Segment {
    /// `parse` rejects records that would wrap, so this cannot overflow.
    fn end(&self) -> u32 {
        self.address + self.data.len() as u32
    }
}

/// A parsed HEX file: segments in file order, adjacent records merged.
#[derive(Debug, Default)]
pub struct Image {
    segments: Vec<Segment>,
}

struct Record {
    kind: u8,
    offset: u16,
    data: Vec<u8>,
}

const DATA: u8 = 0x00;
const END_OF_FILE: u8 = 0x01;
const EXTENDED_SEGMENT: u8 = 0x02;
const START_SEGMENT: u8 = 0x03;
const EXTENDED_LINEAR: u8 = 0x04;
const START_LINEAR: u8 = 0x05;

impl Image {
    pub fn parse(input: &str) -> Result<Self> {
        let mut image = Image::default();
        let mut base: u32 = 0;

        for (idx, line) in input.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let record = parse_record(line).with_context(|| format!("line {}", idx + 1))?;

            match record.kind {
                DATA => {
                    let address = base + u32::from(record.offset);
                    if address.checked_add(record.data.len() as u32).is_none() {
                        bail!(
                            "line {}: data at 0x{:08X} runs past the 32-bit address space",
                            idx + 1,
                            address
                        );
                    }
                    image.push(address, &record.data);
                }
                END_OF_FILE => break,
                EXTENDED_SEGMENT | EXTENDED_LINEAR => {
                    let [hi, lo] = record.data[..] else {
                        bail!("line {}: address record must carry 2 bytes", idx + 1);
                    };
                    let value = u32::from(u16::from_be_bytes([hi, lo]));
                    base = if record.kind == EXTENDED_SEGMENT {
                        value << 4
                    } else {
                        value << 16
                    };
                }
                // Entry points mean nothing on AVR.
                START_SEGMENT | START_LINEAR => {}
                other => bail!("line {}: unsupported record type 0x{:02X}", idx + 1, other),
            }
        }

        Ok(image)
    }

    fn push(&mut self, address: u32, data: &[u8]) {
        if let Some(last) = self.segments.last_mut() {
            if last.end() == address {
                last.data.extend_from_slice(data);
                return;
            }
        }
        self.segments.push(Segment {
            address,
            data: data.to_vec(),
        });
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// One past the highest address written.
    pub fn end(&self) -> u32 {
        self.segments.iter().map(Segment::end).max().unwrap_or(0)
    }

    /// Total data bytes, gaps excluded.
    pub fn size(&self) -> usize {
        self.segments.iter().map(|s| s.data.len()).sum()
    }

    /// Byte at `address`, if the image covers it.
    pub fn byte_at(&self, address: u32) -> Option<u8> {
        self.segments
            .iter()
            .rev()
            .find(|s| (s.address..s.end()).contains(&address))
            .map(|s| s.data[(address - s.address) as usize])
    }

    /// Fail if anything lies beyond `capacity` bytes.
    pub fn check_fits(&self, capacity: u32) -> Result<()> {
        let end = self.end();
        if end > capacity {
            bail!(
                "image ends at 0x{:04X}, {} bytes past the {} byte memory",
                end,
                end - capacity,
                capacity
            );
        }
        Ok(())
    }

    /// The calibration an EEPROM dump holds, `None` if the cell is erased.
    pub fn stored_calibration(&self) -> Result<Option<u8>> {
        self.check_fits(EEPROM_SIZE)
            .context("not an ATtiny85 EEPROM dump")?;
        let Some(value) = self.byte_at(u32::from(EEPROM_ADDR)) else {
            bail!("dump does not cover address {}", EEPROM_ADDR);
        };
        Ok((value != NO_CALIBRATION).then_some(value))
    }
}

fn parse_record(line: &str) -> Result<Record> {
    let Some(hex) = line.strip_prefix(':') else {
        bail!("missing start code ':'");
    };
    let bytes = decode_hex_bytes(hex)?;

    let [count, addr_hi, addr_lo, kind, ..] = bytes[..] else {
        bail!("record too short");
    };
    let count = usize::from(count);
    if bytes.len() != 5 + count {
        bail!("expected {} data bytes, got {}", count, bytes.len().saturating_sub(5));
    }

    // All bytes including the checksum sum to zero.
    if bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b)) != 0 {
        bail!("checksum mismatch");
    }

    Ok(Record {
        kind,
        offset: u16::from_be_bytes([addr_hi, addr_lo]),
        data: bytes[4..4 + count].to_vec(),
    })
}

fn decode_hex_bytes(hex: &str) -> Result<Vec<u8>> {
    if hex.len() % 2 != 0 {
        bail!("odd number of hex characters");
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            hex.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .with_context(|| format!("invalid hex at position {}", i))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EOF: &str = ":00000001FF";

    #[test]
    fn eeprom_with_calibration() {
        let dump = format!(":0400000059FFFFFFA6\n{EOF}\n");
        let image = Image::parse(&dump).unwrap();
        assert_eq!(image.stored_calibration().unwrap(), Some(0x59));
    }

    #[test]
    fn erased_eeprom() {
        let dump = format!(":04000000FFFFFFFF00\n{EOF}\n");
        let image = Image::parse(&dump).unwrap();
        assert_eq!(image.stored_calibration().unwrap(), None);
    }

    #[test]
    fn eeprom_dump_must_cover_byte_zero() {
        let image = Image::parse(&format!(":020004001122C7\n{EOF}\n")).unwrap();
        assert!(image.stored_calibration().is_err());
    }

    #[test]
    fn flash_image_too_big_for_eeprom() {
        let image = Image::parse(&format!(":041FFC0001020304D7\n{EOF}\n")).unwrap();
        assert!(image.stored_calibration().is_err());
    }

    #[test]
    fn firmware_fits_flash() {
        let hex = format!(":040000000C94340028\n:041FFC0001020304D7\n{EOF}\n");
        let image = Image::parse(&hex).unwrap();
        assert_eq!(image.end(), FLASH_SIZE);
        assert_eq!(image.size(), 8);
        assert!(image.check_fits(FLASH_SIZE).is_ok());
    }

    #[test]
    fn firmware_overflows_flash() {
        let image = Image::parse(&format!(":041FFE0001020304D5\n{EOF}\n")).unwrap();
        let err = image.check_fits(FLASH_SIZE).unwrap_err();
        assert!(err.to_string().contains("2 bytes past"), "{err}");
    }

    #[test]
    fn adjacent_records_merge() {
        let hex = format!(":0400000059FFFFFFA6\n:020004001122C7\n{EOF}\n");
        let image = Image::parse(&hex).unwrap();
        assert_eq!(image.segments().len(), 1);
        assert_eq!(image.byte_at(5), Some(0x22));
        assert_eq!(image.byte_at(6), None);
    }

    #[test]
    fn extended_addresses() {
        let hex = format!(":020000020100FB\n:02001000AABB89\n:020000040001F9\n:02001000AABB89\n{EOF}\n");
        let image = Image::parse(&hex).unwrap();
        let starts: Vec<u32> = image.segments().iter().map(|s| s.address).collect();
        assert_eq!(starts, vec![0x1010, 0x1_0010]);
    }

    #[test]
    fn rejects_data_past_address_space() {
        let hex = format!(":02000004FFFFFC\n:02FFFF00AABB9B\n{EOF}\n");
        let err = Image::parse(&hex).unwrap_err();
        assert!(err.to_string().contains("32-bit address space"), "{err}");
    }

    #[test]
    fn rejects_bad_checksum() {
        let err = Image::parse(":0400000059FFFFFF00\n").unwrap_err();
        assert!(format!("{err:#}").contains("checksum"), "{err:#}");
    }

    #[test]
    fn rejects_missing_start_code() {
        assert!(Image::parse("0400000059FFFFFFA6\n").is_err());
    }

    #[test]
    fn data_after_end_of_file_is_ignored() {
        let hex = format!("{EOF}\n:0400000059FFFFFFA6\n");
        assert_eq!(Image::parse(&hex).unwrap().size(), 0);
    }
}
