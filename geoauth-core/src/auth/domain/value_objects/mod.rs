// Refresh-token lifecycle values. Rows are owned by the store; the types here
// only describe them and the policy applied when one is exchanged.

mod refresh_token;

pub use refresh_token::{
    NewRefreshToken, RefreshPolicy, RefreshPolicyParseError,
    RefreshTokenId, RefreshTokenRecord,
};
