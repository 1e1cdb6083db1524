//! Banrisul (041): CNAB 400 remessa and retorno.

use super::{BankProfile, NossoNumeroRule, Part};
use crate::check_digit::Algorithm;
use crate::layout::{
    alpha, blank, date, field, money, num, Column, Decode, FieldSpec, RecordLayout, RemessaLayout,
    RetornoLayout, SegmentSpec, Source::*,
};
use crate::retorno;
use crate::types::{OccurrenceKind, SlipField};
use crate::Layout;

const DMY: &str = "%d%m%y";

pub static BANRISUL: BankProfile = BankProfile {
    code: "041",
    name: "BANRISUL",
    wallets: &["1"],
    species: &[("DM", "01"), ("NP", "02"), ("DS", "04")],
    required: &[
        SlipField::Wallet,
        SlipField::Agency,
        SlipField::Contract,
        SlipField::Number,
    ],
    nosso_numero: NossoNumeroRule {
        number_width: 8,
        check_over: &[Part::Number(8)],
        algorithm: Algorithm::DoubleDigit,
    },
    free_field: &[
        Part::Literal("21"),
        Part::Agency(4),
        Part::Contract(7),
        Part::Number(8),
        Part::Literal("40"),
        Part::CheckDigits(Algorithm::DoubleDigit),
    ],
    agency_check: None,
    remessa: &[RemessaLayout {
        layout: Layout::Cnab400,
        header: RecordLayout {
            name: "header",
            columns: HEADER,
        },
        batch_header: None,
        segments: &[RecordLayout {
            name: "detail",
            columns: DETAIL,
        }],
        batch_trailer: None,
        trailer: RecordLayout {
            name: "trailer",
            columns: TRAILER,
        },
        line_ending: "\r\n",
        final_line_ending: "\r\n",
    }],
    retorno: &[RetornoLayout {
        layout: Layout::Cnab400,
        record_type_column: 1,
        segment_column: None,
        header: RETORNO_HEADER,
        batch_header: &[],
        segments: &[SegmentSpec {
            marker: "",
            starts_record: true,
            fields: RETORNO_DETAIL,
        }],
        batch_trailer: &[],
        trailer: RETORNO_TRAILER,
    }],
    occurrences: &[
        ("02", OccurrenceKind::Entered),
        ("03", OccurrenceKind::Rejected),
        ("06", OccurrenceKind::Paid),
        ("07", OccurrenceKind::Paid),
        ("08", OccurrenceKind::Paid),
        ("09", OccurrenceKind::WrittenOff),
        ("10", OccurrenceKind::WrittenOff),
        ("12", OccurrenceKind::Changed),
        ("13", OccurrenceKind::Changed),
        ("14", OccurrenceKind::Changed),
        ("15", OccurrenceKind::Paid),
        ("19", OccurrenceKind::Protest),
        ("20", OccurrenceKind::Protest),
        ("23", OccurrenceKind::Protest),
    ],
    retorno_finalize: Some(retorno::summarize),
};

const HEADER: &[Column] = &[
    num(1, 1, Literal("0")),
    num(2, 2, Literal("1")),
    alpha(3, 9, Literal("REMESSA")),
    num(10, 11, Literal("01")),
    alpha(12, 26, Literal("COBRANCA")),
    num(27, 39, Contract),
    blank(40, 46),
    alpha(47, 76, BeneficiaryName),
    num(77, 79, BankCode),
    alpha(80, 94, BankName),
    date(95, 100, DMY, GeneratedDate),
    blank(101, 394),
    num(395, 400, Sequence),
];

const DETAIL: &[Column] = &[
    num(1, 1, Literal("1")),
    num(2, 3, BeneficiaryKind),
    num(4, 17, BeneficiaryDocument),
    num(18, 30, Contract),
    blank(31, 37),
    alpha(38, 62, ControlNumber),
    num(63, 72, NossoNumero),
    blank(73, 104),
    blank(105, 107),
    num(108, 108, Wallet),
    num(109, 110, Literal("01")),
    alpha(111, 120, DocumentNumber),
    date(121, 126, DMY, DueDate),
    money(127, 139, Amount),
    num(140, 142, BankCode),
    blank(143, 147),
    num(148, 149, SpeciesCode),
    alpha(150, 150, Literal("N")),
    date(151, 156, DMY, IssueDate),
    num(157, 158, Zero),
    num(159, 160, Zero),
    num(161, 161, Zero),
    money(162, 173, InterestPerDay),
    num(174, 179, Zero),
    money(180, 192, Discount),
    num(193, 205, Zero),
    num(206, 218, Zero),
    num(219, 220, PayerKind),
    num(221, 234, PayerDocument),
    alpha(235, 269, PayerName),
    blank(270, 274),
    alpha(275, 314, PayerAddress),
    blank(315, 321),
    num(322, 324, Zero),
    num(325, 326, Zero),
    num(327, 331, PayerPostalPrefix),
    num(332, 334, PayerPostalSuffix),
    alpha(335, 349, PayerCity),
    alpha(350, 351, PayerState),
    num(352, 355, Zero),
    blank(356, 356),
    num(357, 369, Zero),
    num(370, 371, Zero),
    blank(372, 394),
    num(395, 400, Sequence),
];

const TRAILER: &[Column] = &[
    num(1, 1, Literal("9")),
    blank(2, 27),
    money(28, 40, TotalAmount),
    num(41, 46, SlipCount),
    blank(47, 394),
    num(395, 400, Sequence),
];

const RETORNO_HEADER: &[FieldSpec] = &[
    field("file_kind", 2, 2, Decode::Text),
    field("file_label", 3, 9, Decode::Text),
    field("contract", 27, 39, Decode::Text),
    field("company_name", 47, 76, Decode::Text),
    field("bank_code", 77, 79, Decode::Digits),
    field("bank_name", 80, 94, Decode::Text),
    field("file_date", 95, 100, Decode::Date(DMY)),
    field("sequence", 395, 400, Decode::Integer),
];

const RETORNO_DETAIL: &[FieldSpec] = &[
    field("company_kind", 2, 3, Decode::Text),
    field("company_document", 4, 17, Decode::Text),
    field("contract", 18, 30, Decode::Text),
    field("control_number", 38, 62, Decode::Text),
    field("nosso_numero", 63, 72, Decode::Digits),
    field("wallet", 108, 108, Decode::Text),
    field("occurrence", 109, 110, Decode::Digits),
    field("occurrence_date", 111, 116, Decode::Date(DMY)),
    field("document_number", 117, 126, Decode::Text),
    field("due_date", 147, 152, Decode::Date(DMY)),
    field("amount", 153, 165, Decode::Amount(2)),
    field("collecting_bank", 166, 168, Decode::Text),
    field("collecting_agency", 169, 172, Decode::Text),
    field("species", 174, 175, Decode::Text),
    field("tariff", 176, 188, Decode::Amount(2)),
    field("abatement", 228, 240, Decode::Amount(2)),
    field("discount", 241, 253, Decode::Amount(2)),
    field("paid_amount", 254, 266, Decode::Amount(2)),
    field("interest", 267, 279, Decode::Amount(2)),
    field("fine", 280, 292, Decode::Amount(2)),
    field("credit_date", 296, 301, Decode::Date(DMY)),
    field("rejection_reasons", 383, 392, Decode::Text),
    field("sequence", 395, 400, Decode::Integer),
];

const RETORNO_TRAILER: &[FieldSpec] = &[
    field("bank_code", 5, 7, Decode::Text),
    field("slip_count", 18, 25, Decode::Integer),
    field("total_amount", 26, 39, Decode::Amount(2)),
    field("sequence", 395, 400, Decode::Integer),
];
