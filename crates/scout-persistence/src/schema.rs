//! Esquema Diesel. Reemplazable con `diesel print-schema`.

diesel::table! {
    workflow_checkpoints (run_id, seq) {
        run_id -> Text,
        seq -> BigInt,
        stage -> Text,
        fingerprint -> Text,
        state -> Jsonb,
        created_at -> Timestamptz,
    }
}
