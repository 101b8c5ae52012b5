//! Display-ready rows for the order book, options chain and ticker tape.
//!
//! Every numeric cell is produced by the masking formatter; nothing here
//! formats a number on its own.

use data_feed::RandomSource;
use market_core::{
    format_value_scrambled, format_value_with, MaskPolicy, OptionsChain, OrderBook, OrderRow,
    TickerItem,
};
use serde::{Deserialize, Serialize};

const PRICE_PRECISION: usize = 2;
const AMOUNT_PRECISION: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookLine {
    pub price: String,
    pub amount: String,
    pub total: String,
    pub masked: bool,
}

impl BookLine {
    /// Masked cells carry a fresh letter suffix per build, so the sealed book flickers.
    fn from_row<R: RandomSource + ?Sized>(row: &OrderRow, policy: MaskPolicy, rng: &mut R) -> Self {
        let masked = policy.resolve(row.encrypted());
        let mut cell = |value: f64, precision: usize| {
            format_value_scrambled(value, masked, precision, || rng.next_unit())
        };
        Self {
            price: cell(row.price(), PRICE_PRECISION),
            amount: cell(row.amount(), AMOUNT_PRECISION),
            total: cell(row.total(), PRICE_PRECISION),
            masked,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookTable {
    /// Farthest ask first, so the best ask sits just above the mid banner.
    pub asks: Vec<BookLine>,
    pub mid: String,
    /// Best bid first.
    pub bids: Vec<BookLine>,
    pub decrypted: bool,
}

impl OrderBookTable {
    /// `decrypted` is the view-wide toggle; it overrides every row's own flag.
    /// `rng` feeds the scramble suffix of masked cells.
    pub fn new<R: RandomSource + ?Sized>(book: &OrderBook, decrypted: bool, rng: &mut R) -> Self {
        let policy = MaskPolicy::Force(!decrypted);
        let asks = book
            .asks
            .iter()
            .rev()
            .map(|r| BookLine::from_row(r, policy, &mut *rng))
            .collect();
        let bids = book
            .bids
            .iter()
            .map(|r| BookLine::from_row(r, policy, &mut *rng))
            .collect();
        Self {
            asks,
            mid: format_value_with(book.mid, false, PRICE_PRECISION),
            bids,
            decrypted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainLine {
    pub strike: String,
    pub call_volume: String,
    pub call_bid: String,
    pub call_ask: String,
    pub call_iv: String,
    pub put_iv: String,
    pub put_bid: String,
    pub put_ask: String,
    pub put_volume: String,
    pub atm: bool,
    pub masked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionsChainTable {
    pub spot: String,
    pub expiry: String,
    pub rows: Vec<ChainLine>,
}

impl OptionsChainTable {
    pub fn new(chain: &OptionsChain) -> Self {
        let atm = chain.atm_index();
        let rows = chain
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let m = row.encrypted;
                ChainLine {
                    strike: format_value_with(row.strike, false, 0),
                    call_volume: format_value_with(row.call_volume as f64, false, 0),
                    call_bid: format_value_with(row.call_bid, m, PRICE_PRECISION),
                    call_ask: format_value_with(row.call_ask, m, PRICE_PRECISION),
                    call_iv: format!("{}%", format_value_with(row.call_iv, m, PRICE_PRECISION)),
                    put_iv: format!("{}%", format_value_with(row.put_iv, m, PRICE_PRECISION)),
                    put_bid: format_value_with(row.put_bid, m, PRICE_PRECISION),
                    put_ask: format_value_with(row.put_ask, m, PRICE_PRECISION),
                    put_volume: format_value_with(row.put_volume as f64, false, 0),
                    atm: Some(i) == atm,
                    masked: m,
                }
            })
            .collect();
        Self {
            spot: format_value_with(chain.spot, false, PRICE_PRECISION),
            expiry: chain.expiry.format("%Y-%m-%d").to_string(),
            rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerCell {
    pub symbol: String,
    pub strike: String,
    pub kind: String,
    pub expiry: String,
    pub bid: String,
    pub ask: String,
    pub iv: String,
    pub masked: bool,
}

impl TickerCell {
    fn from_item(item: &TickerItem) -> Self {
        let m = item.encrypted;
        Self {
            symbol: item.symbol.to_string(),
            strike: format!("${}", format_value_with(item.strike, m, PRICE_PRECISION)),
            kind: item.option_type.to_string(),
            expiry: item.expiry.format("%b %-d").to_string(),
            bid: format!("B:{}", format_value_with(item.bid, m, PRICE_PRECISION)),
            ask: format!("A:{}", format_value_with(item.ask, m, PRICE_PRECISION)),
            iv: format!("IV:{}%", format_value_with(item.iv, m, PRICE_PRECISION)),
            masked: m,
        }
    }
}

/// Scrolling footer tape. The cells are laid out twice so the scroll can wrap
/// without a visible seam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerTape {
    pub cells: Vec<TickerCell>,
}

impl TickerTape {
    pub fn new(items: &[TickerItem]) -> Self {
        let once: Vec<TickerCell> = items.iter().map(TickerCell::from_item).collect();
        let mut cells = Vec::with_capacity(once.len() * 2);
        cells.extend(once.iter().cloned());
        cells.extend(once);
        Self { cells }
    }

    /// Distinct items on the tape.
    pub fn len(&self) -> usize {
        self.cells.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use data_feed::{FixedClock, MarketSimulator, ScriptedRandom, SeededRandom};
    use market_core::{OptionType, Symbol, MASK_GLYPH, MASK_WIDTH};

    fn sim() -> MarketSimulator<SeededRandom, FixedClock> {
        MarketSimulator::new(SeededRandom::new(99), FixedClock(1_706_227_200_000))
    }

    fn has_digit(s: &str) -> bool {
        s.chars().any(|c| c.is_ascii_digit())
    }

    #[test]
    fn sealed_book_masks_every_cell() {
        let book = sim().generate_order_book(8, 2450.0).unwrap();
        let table = OrderBookTable::new(&book, false, &mut SeededRandom::new(1));
        assert_eq!(table.asks.len(), 8);
        assert_eq!(table.mid, "2450.00");
        for line in table.asks.iter().chain(table.bids.iter()) {
            assert!(line.masked);
            assert!(!has_digit(&line.price) && !has_digit(&line.amount) && !has_digit(&line.total));
            assert!(line.price.starts_with(MASK_GLYPH));
        }
    }

    #[test]
    fn decrypted_book_overrides_row_flags() {
        let book = sim().generate_order_book(8, 2450.0).unwrap();
        let table = OrderBookTable::new(&book, true, &mut SeededRandom::new(1));
        // Asks are listed farthest first.
        assert_eq!(table.asks.last().map(|l| l.price.as_str()), Some("2450.50"));
        assert_eq!(table.asks[0].price, "2454.00");
        assert_eq!(table.bids[0].price, "2449.50");
        assert!(table.bids.iter().all(|l| !l.masked));
    }

    #[test]
    fn sealed_cells_flicker_between_builds() {
        let book = sim().generate_order_book(2, 2450.0).unwrap();
        // 0.0 -> 'a', 0.99 -> 'z'
        let first = OrderBookTable::new(&book, false, &mut ScriptedRandom::constant(0.0));
        let second = OrderBookTable::new(&book, false, &mut ScriptedRandom::constant(0.99));
        let glyphs: String = std::iter::repeat(MASK_GLYPH).take(MASK_WIDTH).collect();
        assert_eq!(first.bids[0].price, format!("{glyphs}aa"));
        assert_eq!(second.bids[0].price, format!("{glyphs}zz"));
        assert_ne!(first, second);

        // Decrypted cells never draw a suffix.
        let open = OrderBookTable::new(&book, true, &mut ScriptedRandom::constant(0.0));
        assert_eq!(open.bids[0].price, "2449.50");
    }

    #[test]
    fn chain_marks_atm_and_never_masks_volume() {
        let chain = sim().generate_options_chain(2450.0, 5).unwrap();
        let table = OptionsChainTable::new(&chain);
        assert_eq!(table.rows.len(), 11);
        assert_eq!(table.rows.iter().filter(|r| r.atm).count(), 1);
        assert!(table.rows[5].atm);
        assert_eq!(table.rows[5].strike, "2450");
        for (line, row) in table.rows.iter().zip(&chain.rows) {
            assert_eq!(line.call_volume, row.call_volume.to_string());
            assert_eq!(line.masked, row.encrypted);
            if row.encrypted {
                assert!(!has_digit(&line.call_bid) && !has_digit(&line.put_iv));
            } else {
                assert_eq!(line.call_bid, format!("{:.2}", row.call_bid));
            }
        }
    }

    #[test]
    fn ticker_tape_is_doubled_and_prefixed() {
        let item = TickerItem {
            symbol: Symbol::Eth,
            strike: 2450.0,
            option_type: OptionType::Call,
            expiry: NaiveDate::from_ymd_opt(2024, 2, 2).unwrap(),
            bid: 12.5,
            ask: 17.25,
            iv: 33.333,
            encrypted: false,
        };
        let tape = TickerTape::new(&[item, TickerItem { encrypted: true, ..item }]);
        assert_eq!(tape.cells.len(), 4);
        assert_eq!(tape.len(), 2);
        assert_eq!(tape.cells[0], tape.cells[2]);

        let plain = &tape.cells[0];
        assert_eq!(plain.strike, "$2450.00");
        assert_eq!(plain.kind, "CALL");
        assert_eq!(plain.expiry, "Feb 2");
        assert_eq!(plain.bid, "B:12.50");
        assert_eq!(plain.iv, "IV:33.33%");

        let sealed = &tape.cells[1];
        assert_eq!(sealed.symbol, "ETH");
        assert!(!has_digit(&sealed.strike) && !has_digit(&sealed.ask));
    }
}
