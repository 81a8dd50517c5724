pub mod codec;
pub mod constants;
pub mod frame;
pub mod messages;
pub mod types;

pub use codec::*;
pub use constants::{
    Control, Exchange, KlineType, MessageType, DEFAULT_PORT, MAX_CODE_PAGE, MAX_HISTORY_TRADE_PAGE, MAX_KLINE_PAGE,
    MAX_TRADE_PAGE, PREFIX, PREFIX_RESP,
};
pub use frame::{FrameBuffer, FrameError, RequestFrame, ResponseFrame};
pub use messages::*;
pub use types::{
    CallAuction, CallAuctionResponse, CodeResponse, Gbbq, GbbqDetail, GbbqResponse, Kline, KlineCache, KlineResponse,
    MinuteResponse, Price, PriceLevel, PriceLevels, PriceNumber, QuoteInfo, StockCode, Trade, TradeCache, TradeResponse,
    TradeStatus, K,
};
