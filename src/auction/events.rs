// region:    --- Imports
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// endregion: --- Imports

// region:    --- Notification Events

/// 알림 디스패처로 내보내는 이벤트 모델
/// 실제 이메일/SMS/푸시 발송은 외부 디스패처가 담당한다
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum NotificationEvent {
    // 새로운 선두 입찰
    NewLeader {
        auction_id: i64,
        affected_user_id: i64,
        amount: i64,
        timestamp: DateTime<Utc>,
    },
    // 선두 자리를 빼앗긴 이전 입찰자
    Outbid {
        auction_id: i64,
        affected_user_id: i64,
        amount: i64,
        timestamp: DateTime<Utc>,
    },
    // 낙찰
    AuctionWon {
        auction_id: i64,
        affected_user_id: i64,
        amount: i64,
        timestamp: DateTime<Utc>,
    },
    // 패찰
    AuctionLost {
        auction_id: i64,
        affected_user_id: i64,
        amount: i64,
        timestamp: DateTime<Utc>,
    },
    // 입찰 없이 종료(판매자에게 통지)
    NoBids {
        auction_id: i64,
        affected_user_id: i64,
        amount: i64,
        timestamp: DateTime<Utc>,
    },
}

impl NotificationEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            NotificationEvent::NewLeader { .. } => "NewLeader",
            NotificationEvent::Outbid { .. } => "Outbid",
            NotificationEvent::AuctionWon { .. } => "AuctionWon",
            NotificationEvent::AuctionLost { .. } => "AuctionLost",
            NotificationEvent::NoBids { .. } => "NoBids",
        }
    }

    pub fn auction_id(&self) -> i64 {
        match self {
            NotificationEvent::NewLeader { auction_id, .. }
            | NotificationEvent::Outbid { auction_id, .. }
            | NotificationEvent::AuctionWon { auction_id, .. }
            | NotificationEvent::AuctionLost { auction_id, .. }
            | NotificationEvent::NoBids { auction_id, .. } => *auction_id,
        }
    }
}

// endregion: --- Notification Events

// region:    --- Event Derivation

/// 입찰 수락 시 발행할 이벤트 목록
/// 새 선두 이벤트는 항상 1건, 이전 선두가 다른 사용자인 경우에만 Outbid 1건
pub fn bid_accepted_events(
    auction_id: i64,
    new_leader: i64,
    prev_leader: Option<i64>,
    amount: i64,
    timestamp: DateTime<Utc>,
) -> Vec<NotificationEvent> {
    let mut events = vec![NotificationEvent::NewLeader {
        auction_id,
        affected_user_id: new_leader,
        amount,
        timestamp,
    }];
    if let Some(prev) = prev_leader {
        if prev != new_leader {
            events.push(NotificationEvent::Outbid {
                auction_id,
                affected_user_id: prev,
                amount,
                timestamp,
            });
        }
    }
    events
}

/// 경매 종결 시 발행할 이벤트 목록
/// 낙찰자가 있으면 AuctionWon 1건 + 입찰자별로 중복 제거한 AuctionLost,
/// 입찰이 없으면 판매자에게 NoBids 1건
pub fn closing_events(
    auction_id: i64,
    seller_id: i64,
    final_price: i64,
    winner_id: Option<i64>,
    bidder_ids: &[i64],
    timestamp: DateTime<Utc>,
) -> Vec<NotificationEvent> {
    match winner_id {
        Some(winner) => {
            let mut events = vec![NotificationEvent::AuctionWon {
                auction_id,
                affected_user_id: winner,
                amount: final_price,
                timestamp,
            }];
            let mut seen: Vec<i64> = Vec::new();
            for &bidder in bidder_ids {
                if bidder != winner && !seen.contains(&bidder) {
                    seen.push(bidder);
                    events.push(NotificationEvent::AuctionLost {
                        auction_id,
                        affected_user_id: bidder,
                        amount: final_price,
                        timestamp,
                    });
                }
            }
            events
        }
        None => vec![NotificationEvent::NoBids {
            auction_id,
            affected_user_id: seller_id,
            amount: final_price,
            timestamp,
        }],
    }
}

// endregion: --- Event Derivation

// region:    --- Tests

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn first_bid_emits_only_new_leader() {
        let events = bid_accepted_events(1, 10, None, 1000, now());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "NewLeader");
    }

    #[test]
    fn outbid_goes_to_previous_leader() {
        let events = bid_accepted_events(1, 11, Some(10), 2000, now());
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type(), "NewLeader");
        match &events[1] {
            NotificationEvent::Outbid {
                affected_user_id, ..
            } => assert_eq!(*affected_user_id, 10),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn rebid_by_same_leader_emits_no_outbid() {
        let events = bid_accepted_events(1, 10, Some(10), 3000, now());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "NewLeader");
    }

    #[test]
    fn closing_deduplicates_losers() {
        // 입찰자 10이 여러 번 입찰했어도 패찰 통지는 1건
        let events = closing_events(1, 99, 5000, Some(11), &[10, 11, 10, 12, 11], now());
        let lost: Vec<i64> = events
            .iter()
            .filter_map(|e| match e {
                NotificationEvent::AuctionLost {
                    affected_user_id, ..
                } => Some(*affected_user_id),
                _ => None,
            })
            .collect();
        assert_eq!(events[0].event_type(), "AuctionWon");
        assert_eq!(lost, vec![10, 12]);
    }

    #[test]
    fn closing_without_bids_notifies_seller() {
        let events = closing_events(1, 99, 1000, None, &[], now());
        assert_eq!(events.len(), 1);
        match &events[0] {
            NotificationEvent::NoBids {
                affected_user_id, ..
            } => assert_eq!(*affected_user_id, 99),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = NotificationEvent::AuctionWon {
            auction_id: 7,
            affected_user_id: 3,
            amount: 4200,
            timestamp: now(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "AuctionWon");
        assert_eq!(value["auction_id"], 7);
        assert_eq!(value["affected_user_id"], 3);
        assert_eq!(value["amount"], 4200);
    }
}

// endregion: --- Tests
