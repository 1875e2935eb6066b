diesel::table! {
    hop_release (major, minor, patch) {
        major -> Integer,
        minor -> Integer,
        patch -> Integer,
        status -> Text,
        changed_at -> Text,
    }
}

diesel::table! {
    hop_patch (major, minor, patch, ordinal) {
        major -> Integer,
        minor -> Integer,
        patch -> Integer,
        ordinal -> Integer,
        name -> Text,
        checksum -> Text,
        applied_at -> Text,
    }
}
