//! Esquema Diesel (escrito a mano). Reemplazable con `diesel print-schema`.

diesel::table! {
    accounts (id) {
        id -> BigInt,
        email -> Text,
        referral_code -> Text,
        referred_by -> Nullable<Text>,
        created_at -> Timestamp,
    }
}

diesel::table! {
    sessions (token) {
        token -> Text,
        account_id -> BigInt,
        issued_at -> Timestamp,
        expires_at -> Timestamp,
    }
}

diesel::table! {
    click_events (id) {
        id -> BigInt,
        referral_code -> Text,
        source_domain -> Nullable<Text>,
        visitor_hash -> Nullable<Text>,
        created_at -> Timestamp,
    }
}

diesel::table! {
    commission_events (id) {
        id -> BigInt,
        account_id -> BigInt,
        order_id -> Nullable<Text>,
        amount_cents -> BigInt,
        rate_bps -> Integer,
        commission_cents -> BigInt,
        created_at -> Timestamp,
    }
}

diesel::table! {
    contacts (id) {
        id -> BigInt,
        account_id -> BigInt,
        name -> Text,
        email -> Nullable<Text>,
        phone -> Nullable<Text>,
        company -> Nullable<Text>,
        notes -> Nullable<Text>,
        created_at -> Timestamp,
    }
}

diesel::table! {
    activity (id) {
        id -> BigInt,
        account_id -> Nullable<BigInt>,
        action -> Text,
        detail -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    kv_entries (key) {
        key -> Text,
        value -> Text,
        expires_at -> Nullable<Timestamp>,
    }
}

diesel::joinable!(sessions -> accounts (account_id));
diesel::joinable!(commission_events -> accounts (account_id));
diesel::joinable!(contacts -> accounts (account_id));

diesel::allow_tables_to_appear_in_same_query!(
    accounts,
    sessions,
    click_events,
    commission_events,
    contacts,
    activity,
    kv_entries,
);
