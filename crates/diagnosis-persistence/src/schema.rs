// Diesel schema compartido por SQLite y Postgres.
// Tablas: diagnosis, message
diesel::table! {
    diagnosis (id) {
        id -> Integer,
        user_id -> Integer,
        current_operation -> Text,
        validation -> Nullable<Text>,
        score -> Nullable<Text>,
        note -> Nullable<Text>,
        created_at_ts -> BigInt,
        updated_at_ts -> BigInt,
    }
}
diesel::table! {
    message (id) {
        id -> Integer,
        diagnosis_block -> Integer,
        role -> Text,
        message_type -> Text,
        text -> Text,
        order_number -> Integer,
        has_validation -> Bool,
        has_skip -> Bool,
        timestamp_ts -> BigInt,
    }
}
diesel::joinable!(message -> diagnosis (diagnosis_block));
diesel::allow_tables_to_appear_in_same_query!(diagnosis, message);
