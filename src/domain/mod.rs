pub mod detail_record;
pub mod risk;
pub mod search_result;
