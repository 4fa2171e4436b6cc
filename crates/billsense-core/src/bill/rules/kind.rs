//! Utility kind detection from bill vocabulary.

use super::patterns::{ELECTRICITY_HINTS, WATER_HINTS};
use crate::models::bill::BillKind;

/// Guess whether the text belongs to an electricity or a water bill by
/// counting keyword hits. Ties and texts without hints are `Unknown`.
pub fn detect_bill_kind(text: &str) -> BillKind {
    let electricity = ELECTRICITY_HINTS.find_iter(text).count();
    let water = WATER_HINTS.find_iter(text).count();

    match electricity.cmp(&water) {
        std::cmp::Ordering::Greater => BillKind::Electricity,
        std::cmp::Ordering::Less => BillKind::Water,
        std::cmp::Ordering::Equal => BillKind::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_kind() {
        assert_eq!(
            detect_bill_kind("SOUTHERN POWER DISTRIBUTION\nUnits Billed: 250 kWh"),
            BillKind::Electricity
        );
        assert_eq!(
            detect_bill_kind("METROPOLITAN WATER SUPPLY & SEWERAGE BOARD\nConsumption (KL): 15.5"),
            BillKind::Water
        );
        assert_eq!(detect_bill_kind("Total Payable: 450.00"), BillKind::Unknown);
    }
}
