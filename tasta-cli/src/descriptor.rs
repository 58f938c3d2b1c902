//! HID report descriptor decoding (short items only, HID 1.11 section 6.2.2).

use std::fmt;

use anyhow::{bail, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    Main,
    Global,
    Local,
    Reserved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item {
    pub kind: ItemType,
    pub tag: u8,
    /// Payload, little-endian, zero-extended.
    pub data: u32,
    pub size: u8,
}

const LONG_ITEM: u8 = 0xFE;

// Main item tags
const INPUT: u8 = 0x8;
const OUTPUT: u8 = 0x9;
const COLLECTION: u8 = 0xA;
const FEATURE: u8 = 0xB;
const END_COLLECTION: u8 = 0xC;

// Global item tags
const REPORT_SIZE: u8 = 0x7;
const REPORT_ID: u8 = 0x8;
const REPORT_COUNT: u8 = 0x9;

pub fn parse(bytes: &[u8]) -> Result<Vec<Item>> {
    let mut items = Vec::new();
    let mut rest = bytes;

    while let Some((&prefix, tail)) = rest.split_first() {
        if prefix == LONG_ITEM {
            bail!("long item at offset {}", bytes.len() - rest.len());
        }
        let size = match prefix & 0x03 {
            3 => 4,
            n => n,
        };
        let Some(payload) = tail.get(..usize::from(size)) else {
            bail!(
                "item 0x{:02X} at offset {} truncated",
                prefix,
                bytes.len() - rest.len()
            );
        };
        let data = payload
            .iter()
            .rev()
            .fold(0u32, |acc, &b| (acc << 8) | u32::from(b));

        items.push(Item {
            kind: match (prefix >> 2) & 0x03 {
                0 => ItemType::Main,
                1 => ItemType::Global,
                2 => ItemType::Local,
                _ => ItemType::Reserved,
            },
            tag: prefix >> 4,
            data,
            size,
        });
        rest = &tail[usize::from(size)..];
    }

    Ok(items)
}

impl Item {
    pub fn name(&self) -> &'static str {
        match (self.kind, self.tag) {
            (ItemType::Main, INPUT) => "Input",
            (ItemType::Main, OUTPUT) => "Output",
            (ItemType::Main, COLLECTION) => "Collection",
            (ItemType::Main, FEATURE) => "Feature",
            (ItemType::Main, END_COLLECTION) => "End Collection",
            (ItemType::Global, 0x0) => "Usage Page",
            (ItemType::Global, 0x1) => "Logical Minimum",
            (ItemType::Global, 0x2) => "Logical Maximum",
            (ItemType::Global, 0x3) => "Physical Minimum",
            (ItemType::Global, 0x4) => "Physical Maximum",
            (ItemType::Global, 0x5) => "Unit Exponent",
            (ItemType::Global, 0x6) => "Unit",
            (ItemType::Global, REPORT_SIZE) => "Report Size",
            (ItemType::Global, REPORT_ID) => "Report ID",
            (ItemType::Global, REPORT_COUNT) => "Report Count",
            (ItemType::Global, 0xA) => "Push",
            (ItemType::Global, 0xB) => "Pop",
            (ItemType::Local, 0x0) => "Usage",
            (ItemType::Local, 0x1) => "Usage Minimum",
            (ItemType::Local, 0x2) => "Usage Maximum",
            (ItemType::Local, 0x3) => "Designator Index",
            (ItemType::Local, 0x7) => "String Index",
            (ItemType::Local, 0xA) => "Delimiter",
            _ => "Unknown",
        }
    }

    /// Flag names for Input/Output/Feature data bits 0..=2.
    fn flags(&self) -> Option<String> {
        if self.kind != ItemType::Main || !matches!(self.tag, INPUT | OUTPUT | FEATURE) {
            return None;
        }
        let bit = |n: u32, set: &'static str, clear: &'static str| {
            if self.data & (1 << n) != 0 {
                set
            } else {
                clear
            }
        };
        Some(format!(
            "{}, {}, {}",
            bit(0, "Constant", "Data"),
            bit(1, "Variable", "Array"),
            bit(2, "Relative", "Absolute"),
        ))
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.flags() {
            Some(flags) => write!(f, "{} ({})", self.name(), flags),
            None if self.size == 0 => write!(f, "{}", self.name()),
            None => write!(f, "{} (0x{:02X})", self.name(), self.data),
        }
    }
}

/// One line per item, indented by collection depth.
pub fn render(items: &[Item]) -> Vec<String> {
    let mut depth = 0usize;
    items
        .iter()
        .map(|item| {
            let is_main = item.kind == ItemType::Main;
            if is_main && item.tag == END_COLLECTION {
                depth = depth.saturating_sub(1);
            }
            let line = format!("{}{}", "  ".repeat(depth), item);
            if is_main && item.tag == COLLECTION {
                depth += 1;
            }
            line
        })
        .collect()
}

/// Input report length in bits, assuming a single report ID-less report.
/// Saturates on absurd sizes from a misbehaving device.
pub fn input_bits(items: &[Item]) -> u32 {
    let mut size = 0u32;
    let mut count = 0u32;
    let mut bits = 0u32;
    for item in items {
        match (item.kind, item.tag) {
            (ItemType::Global, REPORT_SIZE) => size = item.data,
            (ItemType::Global, REPORT_COUNT) => count = item.data,
            (ItemType::Main, INPUT) => {
                bits = bits.saturating_add(size.saturating_mul(count));
            }
            _ => {}
        }
    }
    bits
}
