diesel::table! {
    job_registry (job_name) {
        job_name -> Text,
        last_run_timestamp -> Timestamptz,
    }
}

diesel::table! {
    payments (id) {
        id -> Uuid,
        user_id -> Uuid,
        amount -> Numeric,
        period_days -> Int4,
        status -> Text,
        gateway_ref -> Nullable<Text>,
        created_timestamp -> Timestamptz,
        modified_timestamp -> Timestamptz,
    }
}

diesel::table! {
    reminders (id) {
        id -> Uuid,
        user_id -> Uuid,
        title -> Text,
        amount -> Numeric,
        pay_date -> Date,
        recurrence -> Text,
        is_active -> Bool,
        created_timestamp -> Timestamptz,
    }
}

diesel::table! {
    users (id) {
        id -> Uuid,
        chat_id -> Int8,
        first_name -> Text,
        last_name -> Nullable<Text>,
        username -> Nullable<Text>,
        is_premium -> Bool,
        premium_until -> Nullable<Timestamptz>,
        created_timestamp -> Timestamptz,
    }
}

diesel::joinable!(payments -> users (user_id));
diesel::joinable!(reminders -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(payments, reminders, users,);
