table! {
    notes (id) {
        id -> Int4,
        title -> Varchar,
        content -> Nullable<Text>,
        user_id -> Int4,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    users (id) {
        id -> Int4,
        username -> Varchar,
        email -> Varchar,
        hashed_password -> Varchar,
        is_active -> Bool,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

joinable!(notes -> users (user_id));

allow_tables_to_appear_in_same_query!(notes, users);
