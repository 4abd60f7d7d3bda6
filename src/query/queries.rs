/// 경매 조회
pub const GET_AUCTION: &str = "SELECT id, title, description, seller_id, starting_price, current_price, increment_amount, buy_now_price, start_time, end_time, status, winner_id, total_bids, unique_bidders, version, created_at FROM auctions WHERE id = $1";

/// 모든 경매 조회
pub const GET_ALL_AUCTIONS: &str = "SELECT id, title, description, seller_id, starting_price, current_price, increment_amount, buy_now_price, start_time, end_time, status, winner_id, total_bids, unique_bidders, version, created_at FROM auctions ORDER BY created_at DESC";

/// 최고 입찰 조회
pub const GET_HIGHEST_BID: &str =
    "SELECT MAX(amount) as highest_bid FROM bids WHERE auction_id = $1";
