//! Esquema Diesel (escrito a mano). Reemplazable con `diesel print-schema`.

diesel::table! {
    events (id) {
        id -> Int4,
        widget_id -> Uuid,
        version -> Int8,
        value -> Text,
        recorded_at -> Timestamptz,
    }
}

diesel::table! {
    views (id) {
        id -> Int4,
        widget_id -> Uuid,
        version -> Int8,
        value -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    events,
    views,
);
