//! Bancoob / Sicoob (756): CNAB 240 remessa and retorno.

use super::{BankProfile, NossoNumeroRule, Part};
use crate::check_digit::{Algorithm, Modulo11Exceptions};
use crate::layout::{
    alpha, blank, date, field, money, num, Column, Decode, FieldSpec, RecordLayout, RemessaLayout,
    RetornoLayout, SegmentSpec, Source::*,
};
use crate::retorno;
use crate::types::{OccurrenceKind, SlipField};
use crate::Layout;

const DMY: &str = "%d%m%Y";

pub static BANCOOB: BankProfile = BankProfile {
    code: "756",
    name: "SICOOB",
    wallets: &["1", "3"],
    species: &[("DM", "01"), ("NP", "02"), ("DS", "12")],
    required: &[
        SlipField::Wallet,
        SlipField::Agency,
        SlipField::Account,
        SlipField::Contract,
        SlipField::Number,
    ],
    nosso_numero: NossoNumeroRule {
        number_width: 7,
        check_over: &[Part::Agency(4), Part::Contract(10), Part::Number(7)],
        algorithm: Algorithm::modulo11(Modulo11Exceptions::new(0, 1)),
    },
    free_field: &[
        Part::Wallet(1),
        Part::Agency(4),
        Part::Wallet(2),
        Part::Contract(7),
        Part::NossoNumero(8),
        Part::Installment(3),
    ],
    agency_check: Some(Algorithm::modulo11(Modulo11Exceptions::new(0, 0))),
    remessa: &[RemessaLayout {
        layout: Layout::Cnab240,
        header: RecordLayout {
            name: "file header",
            columns: HEADER,
        },
        batch_header: Some(RecordLayout {
            name: "batch header",
            columns: BATCH_HEADER,
        }),
        segments: &[
            RecordLayout {
                name: "segment P",
                columns: SEGMENT_P,
            },
            RecordLayout {
                name: "segment Q",
                columns: SEGMENT_Q,
            },
            RecordLayout {
                name: "segment R",
                columns: SEGMENT_R,
            },
            RecordLayout {
                name: "segment S",
                columns: SEGMENT_S,
            },
        ],
        batch_trailer: Some(RecordLayout {
            name: "batch trailer",
            columns: BATCH_TRAILER,
        }),
        trailer: RecordLayout {
            name: "file trailer",
            columns: TRAILER,
        },
        line_ending: "\r\n",
        final_line_ending: "",
    }],
    retorno: &[RetornoLayout {
        layout: Layout::Cnab240,
        record_type_column: 8,
        segment_column: Some(14),
        header: RETORNO_HEADER,
        batch_header: RETORNO_BATCH_HEADER,
        segments: &[
            SegmentSpec {
                marker: "T",
                starts_record: true,
                fields: RETORNO_SEGMENT_T,
            },
            SegmentSpec {
                marker: "U",
                starts_record: false,
                fields: RETORNO_SEGMENT_U,
            },
        ],
        batch_trailer: RETORNO_BATCH_TRAILER,
        trailer: RETORNO_TRAILER,
    }],
    occurrences: &[
        ("02", OccurrenceKind::Entered),
        ("03", OccurrenceKind::Rejected),
        ("06", OccurrenceKind::Paid),
        ("09", OccurrenceKind::WrittenOff),
        ("10", OccurrenceKind::WrittenOff),
        ("11", OccurrenceKind::Other),
        ("12", OccurrenceKind::Changed),
        ("14", OccurrenceKind::Changed),
        ("17", OccurrenceKind::Paid),
        ("19", OccurrenceKind::Protest),
        ("20", OccurrenceKind::Protest),
        ("23", OccurrenceKind::Protest),
        ("26", OccurrenceKind::Rejected),
        ("27", OccurrenceKind::Changed),
        ("30", OccurrenceKind::Rejected),
    ],
    retorno_finalize: Some(retorno::reconcile),
};

const HEADER: &[Column] = &[
    num(1, 3, BankCode),
    num(4, 7, Literal("0000")),
    num(8, 8, Literal("0")),
    blank(9, 17),
    num(18, 18, BeneficiaryKind),
    num(19, 32, BeneficiaryDocument),
    alpha(33, 52, Contract),
    num(53, 57, Agency),
    num(58, 58, AgencyDv),
    num(59, 70, Account),
    num(71, 71, AccountDv),
    blank(72, 72),
    alpha(73, 102, BeneficiaryName),
    alpha(103, 132, BankName),
    blank(133, 142),
    num(143, 143, Literal("1")),
    date(144, 151, DMY, GeneratedDate),
    date(152, 157, "%H%M%S", GeneratedTime),
    num(158, 163, FileSequence),
    num(164, 166, Literal("081")),
    num(167, 171, Zero),
    blank(172, 191),
    blank(192, 211),
    blank(212, 240),
];

const BATCH_HEADER: &[Column] = &[
    num(1, 3, BankCode),
    num(4, 7, Literal("0001")),
    num(8, 8, Literal("1")),
    alpha(9, 9, Literal("R")),
    num(10, 11, Literal("01")),
    blank(12, 13),
    num(14, 16, Literal("040")),
    blank(17, 17),
    num(18, 18, BeneficiaryKind),
    num(19, 33, BeneficiaryDocument),
    blank(34, 53),
    num(54, 58, Agency),
    num(59, 59, AgencyDv),
    num(60, 71, Account),
    num(72, 72, AccountDv),
    blank(73, 73),
    alpha(74, 103, BeneficiaryName),
    blank(104, 143),
    blank(144, 183),
    num(184, 191, FileSequence),
    date(192, 199, DMY, GeneratedDate),
    blank(200, 240),
];

/// Detail segment: columns 1-17 are shared, the rest is per segment.
macro_rules! segment {
    ($letter:literal, [$($column:expr),* $(,)?]) => {
        &[
            num(1, 3, BankCode),
            num(4, 7, Literal("0001")),
            num(8, 8, Literal("3")),
            num(9, 13, Sequence),
            alpha(14, 14, Literal($letter)),
            blank(15, 15),
            num(16, 17, Literal("01")),
            $($column),*
        ]
    };
}

const SEGMENT_P: &[Column] = segment!(
    "P",
    [
        num(18, 22, Agency),
        num(23, 23, AgencyDv),
        num(24, 35, Account),
        num(36, 36, AccountDv),
        blank(37, 37),
        num(38, 47, NossoNumero),
        num(48, 49, Installment),
        num(50, 51, Literal("01")),
        num(52, 52, Literal("4")),
        blank(53, 57),
        num(58, 58, Wallet),
        num(59, 59, Literal("0")),
        blank(60, 60),
        num(61, 61, Literal("2")),
        num(62, 62, Literal("2")),
        alpha(63, 77, ControlNumber),
        date(78, 85, DMY, DueDate),
        money(86, 100, Amount),
        num(101, 105, Zero),
        blank(106, 106),
        num(107, 108, SpeciesCode),
        alpha(109, 109, Literal("N")),
        date(110, 117, DMY, IssueDate),
        num(118, 118, Literal("1")),
        date(119, 126, DMY, DueDate),
        money(127, 141, InterestPerDay),
        num(142, 142, Literal("0")),
        blank(143, 150),
        money(151, 165, Discount),
        num(166, 180, Zero),
        num(181, 195, Zero),
        blank(196, 220),
        num(221, 221, Literal("1")),
        num(222, 223, Zero),
        num(224, 224, Zero),
        blank(225, 227),
        num(228, 229, Literal("09")),
        num(230, 239, Zero),
        blank(240, 240),
    ]
);

const SEGMENT_Q: &[Column] = segment!(
    "Q",
    [
        num(18, 18, PayerKind),
        num(19, 33, PayerDocument),
        alpha(34, 73, PayerName),
        alpha(74, 113, PayerAddress),
        alpha(114, 128, PayerDistrict),
        num(129, 133, PayerPostalPrefix),
        num(134, 136, PayerPostalSuffix),
        alpha(137, 151, PayerCity),
        alpha(152, 153, PayerState),
        num(154, 154, Zero),
        num(155, 169, Zero),
        blank(170, 209),
        num(210, 212, Zero),
        blank(213, 232),
        blank(233, 240),
    ]
);

const SEGMENT_R: &[Column] = segment!(
    "R",
    [
        num(18, 18, Literal("0")),
        num(19, 26, Zero),
        num(27, 65, Zero),
        num(66, 66, Literal("1")),
        date(67, 74, DMY, DueDate),
        num(75, 89, Zero),
        blank(90, 99),
        blank(100, 139),
        blank(140, 179),
        blank(180, 199),
        num(200, 215, Zero),
        blank(216, 216),
        num(217, 228, Zero),
        blank(229, 230),
        num(231, 231, Literal("0")),
        blank(232, 240),
    ]
);

const SEGMENT_S: &[Column] = segment!(
    "S",
    [
        num(18, 18, Literal("3")),
        blank(19, 240),
    ]
);

const BATCH_TRAILER: &[Column] = &[
    num(1, 3, BankCode),
    num(4, 7, Literal("0001")),
    num(8, 8, Literal("5")),
    blank(9, 17),
    num(18, 23, BatchRecordCount),
    num(24, 29, SlipCount),
    money(30, 46, TotalAmount),
    num(47, 115, Zero),
    blank(116, 240),
];

const TRAILER: &[Column] = &[
    num(1, 3, BankCode),
    num(4, 7, Literal("9999")),
    num(8, 8, Literal("9")),
    blank(9, 17),
    num(18, 23, Literal("1")),
    num(24, 29, FileRecordCount),
    num(30, 35, Zero),
    blank(36, 240),
];

const RETORNO_HEADER: &[FieldSpec] = &[
    field("bank_code", 1, 3, Decode::Digits),
    field("company_kind", 18, 18, Decode::Text),
    field("company_document", 19, 32, Decode::Text),
    field("contract", 33, 52, Decode::Text),
    field("agency", 53, 57, Decode::Text),
    field("account", 59, 70, Decode::Text),
    field("company_name", 73, 102, Decode::Text),
    field("bank_name", 103, 132, Decode::Text),
    field("file_kind", 143, 143, Decode::Text),
    field("file_date", 144, 151, Decode::Date(DMY)),
    field("file_sequence", 158, 163, Decode::Integer),
];

const RETORNO_BATCH_HEADER: &[FieldSpec] = &[
    field("operation", 9, 9, Decode::Text),
    field("retorno_number", 184, 191, Decode::Integer),
    field("recording_date", 192, 199, Decode::Date(DMY)),
    field("credit_date", 200, 207, Decode::Date(DMY)),
];

const RETORNO_SEGMENT_T: &[FieldSpec] = &[
    field("batch_sequence", 9, 13, Decode::Integer),
    field("occurrence", 16, 17, Decode::Digits),
    field("agency", 18, 22, Decode::Text),
    field("account", 24, 35, Decode::Text),
    field("nosso_numero", 38, 47, Decode::Digits),
    field("installment", 48, 49, Decode::Text),
    field("wallet", 58, 58, Decode::Text),
    field("document_number", 59, 73, Decode::Text),
    field("due_date", 74, 81, Decode::Date(DMY)),
    field("amount", 82, 96, Decode::Amount(2)),
    field("collecting_bank", 97, 99, Decode::Text),
    field("collecting_agency", 100, 104, Decode::Text),
    field("control_number", 106, 130, Decode::Text),
    field("payer_kind", 133, 133, Decode::Text),
    field("payer_document", 134, 148, Decode::Text),
    field("payer_name", 149, 188, Decode::Text),
    field("tariff", 199, 213, Decode::Amount(2)),
    field("rejection_reasons", 214, 223, Decode::Text),
];

const RETORNO_SEGMENT_U: &[FieldSpec] = &[
    field("interest", 18, 32, Decode::Amount(2)),
    field("discount", 33, 47, Decode::Amount(2)),
    field("abatement", 48, 62, Decode::Amount(2)),
    field("iof", 63, 77, Decode::Amount(2)),
    field("paid_amount", 78, 92, Decode::Amount(2)),
    field("net_amount", 93, 107, Decode::Amount(2)),
    field("other_expenses", 108, 122, Decode::Amount(2)),
    field("other_credits", 123, 137, Decode::Amount(2)),
    field("occurrence_date", 138, 145, Decode::Date(DMY)),
    field("credit_date", 146, 153, Decode::Date(DMY)),
];

const RETORNO_BATCH_TRAILER: &[FieldSpec] = &[field("batch_records", 18, 23, Decode::Integer)];

const RETORNO_TRAILER: &[FieldSpec] = &[
    field("batches", 18, 23, Decode::Integer),
    field("records", 24, 29, Decode::Integer),
];
