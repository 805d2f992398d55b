pub mod ddm;
pub mod payout;
