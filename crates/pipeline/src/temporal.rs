//! Temporal context — where "now" falls in the restaurant's calendar.
//!
//! The calendar is fixed: open from 15 May to 15 September, serving lunch
//! 12:30–15:00 and dinner 19:30–22:00. [`compute`] is pure; callers pick the
//! clock via [`now`].

use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::Serialize;

const OPENING: (u32, u32) = (5, 15);
const CLOSING: (u32, u32) = (9, 15);

/// Service windows as `[start, end)` minutes after midnight.
const LUNCH: (u32, u32) = (12 * 60 + 30, 15 * 60);
const DINNER: (u32, u32) = (19 * 60 + 30, 22 * 60);

const WEEKDAYS: [&str; 7] = [
    "lunedì",
    "martedì",
    "mercoledì",
    "giovedì",
    "venerdì",
    "sabato",
    "domenica",
];

const MONTHS: [&str; 12] = [
    "gennaio",
    "febbraio",
    "marzo",
    "aprile",
    "maggio",
    "giugno",
    "luglio",
    "agosto",
    "settembre",
    "ottobre",
    "novembre",
    "dicembre",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Season {
    /// June through August
    HighSeason,
    /// 15–31 May and 1–15 September
    OpeningWindow,
    /// 16 September through February
    WinterClosed,
    /// March through 14 May
    PreSeason,
}

impl Season {
    pub fn of(date: NaiveDate) -> Self {
        match (date.month(), date.day()) {
            (6..=8, _) => Self::HighSeason,
            (5, d) if d >= OPENING.1 => Self::OpeningWindow,
            (9, d) if d <= CLOSING.1 => Self::OpeningWindow,
            (3 | 4 | 5, _) => Self::PreSeason,
            _ => Self::WinterClosed,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::HighSeason | Self::OpeningWindow)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::HighSeason => "Stagione estiva - Alta stagione turistica",
            Self::OpeningWindow => "Periodo di apertura ristorante - Stagione ideale per visite",
            Self::WinterClosed => "Periodo invernale - Ristorante chiuso ma zona visitabile",
            Self::PreSeason => "Periodo di pre-stagione - Preparativi apertura",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ServiceStatus {
    InService,
    BetweenServices,
    Closed,
}

impl ServiceStatus {
    /// Status at `time`; outside the season the restaurant is always closed.
    pub fn of(season: Season, time: NaiveDateTime) -> Self {
        if !season.is_open() {
            return Self::Closed;
        }
        let minutes = time.hour() * 60 + time.minute();
        let within = |(start, end): (u32, u32)| (start..end).contains(&minutes);

        if within(LUNCH) || within(DINNER) {
            Self::InService
        } else if within((LUNCH.1, DINNER.0)) {
            Self::BetweenServices
        } else {
            Self::Closed
        }
    }
}

/// The computed context for one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalContext {
    pub now: NaiveDateTime,
    pub season: Season,
    pub service_status: ServiceStatus,
}

impl TemporalContext {
    fn status_label(&self) -> &'static str {
        match (self.service_status, self.season.is_open()) {
            (ServiceStatus::InService, _) => "✅ Ristorante attualmente in orario di servizio",
            (ServiceStatus::BetweenServices, _) => {
                "⏰ Ristorante chiuso tra pranzo e cena (riapre alle 19:30)"
            }
            (ServiceStatus::Closed, true) => {
                "🕐 Ristorante attualmente chiuso - riapre per pranzo (12:30) o cena (19:30)"
            }
            (ServiceStatus::Closed, false) => "❄️ Ristorante chiuso per stagione (riapre 15 Maggio)",
        }
    }

    /// `sabato 18 ottobre 2026, 14:05`
    pub fn formatted_now(&self) -> String {
        let date = self.now.date();
        format!(
            "{} {} {} {}, {:02}:{:02}",
            WEEKDAYS[date.weekday().num_days_from_monday() as usize],
            date.day(),
            MONTHS[date.month0() as usize],
            date.year(),
            self.now.hour(),
            self.now.minute(),
        )
    }

    /// The system message text.
    pub fn render(&self) -> String {
        format!(
            "=== CONTESTO TEMPORALE AGGIORNATO ===\n\
             Data e ora attuali: {} (fuso orario italiano)\n\
             Stagione: {}\n\
             Stato servizio: {}\n\
             \n\
             IMPORTANTE per prenotazioni future:\n\
             - Il ristorante è aperto SOLO dal 15 Maggio al 15 Settembre\n\
             - Per richieste di prenotazione, calcola sempre se la data richiesta rientra nel periodo di apertura\n\
             - Se la data è oltre il 15 settembre dell'anno corrente, informa che il ristorante sarà chiuso\n\
             - Se la data è prima del 15 maggio dell'anno successivo, informa della data di riapertura\n\
             \n\
             IMPORTANTE: Usa sempre queste informazioni per fornire risposte contestualizzate al momento attuale e calcolare correttamente le date future.",
            self.formatted_now(),
            self.season.label(),
            self.status_label(),
        )
    }
}

impl std::fmt::Display for TemporalContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

pub fn compute(now: NaiveDateTime) -> TemporalContext {
    let season = Season::of(now.date());
    TemporalContext {
        now,
        season,
        service_status: ServiceStatus::of(season, now),
    }
}

/// Wall-clock time at a fixed UTC offset, or Italian time when none is set.
pub fn now(utc_offset_minutes: Option<i32>) -> NaiveDateTime {
    wall_clock(Utc::now(), utc_offset_minutes)
}

fn wall_clock(utc: DateTime<Utc>, utc_offset_minutes: Option<i32>) -> NaiveDateTime {
    let offset = utc_offset_minutes
        .and_then(|m| m.checked_mul(60))
        .and_then(FixedOffset::east_opt)
        .or_else(|| FixedOffset::east_opt(italian_offset_minutes(utc) * 60));
    match offset {
        Some(offset) => utc.with_timezone(&offset).naive_local(),
        None => utc.naive_utc(),
    }
}

/// CET, or CEST from 01:00 UTC on the last Sunday of March until 01:00 UTC
/// on the last Sunday of October.
fn italian_offset_minutes(utc: DateTime<Utc>) -> i32 {
    let switch = |month| {
        last_sunday_of(utc.year(), month)
            .and_then(|d| d.and_hms_opt(1, 0, 0))
            .map(|t| t.and_utc())
    };
    match (switch(3), switch(10)) {
        (Some(start), Some(end)) if (start..end).contains(&utc) => 120,
        _ => 60,
    }
}

/// Last Sunday of a 31-day month.
fn last_sunday_of(year: i32, month: u32) -> Option<NaiveDate> {
    let last = NaiveDate::from_ymd_opt(year, month, 31)?;
    last.checked_sub_days(Days::new(u64::from(last.weekday().num_days_from_sunday())))
}
