//! Selective Disclosure for JWTs ([SD-JWT][sd-jwt]).
//!
//! An issuer decides, claim by claim, what a holder may later withhold. Each
//! selectively disclosable claim is replaced in the signed payload by the
//! digest of a salted *disclosure*, and the disclosures travel next to the
//! [JWS][jws]:
//!
//! ```text
//! <issuer-signed JWT>~<disclosure 1>~...~<disclosure n>~[<key binding JWT>]
//! ```
//!
//! The holder presents only the disclosures of the claims it wants to reveal,
//! optionally proving possession of a bound key with a key binding JWT. The
//! verifier recomputes every digest and rebuilds the revealed claims.
//!
//! [sd-jwt]: <https://datatracker.ietf.org/doc/draft-ietf-oauth-selective-disclosure-jwt/>
//! [jws]: <https://www.rfc-editor.org/rfc/rfc7515>
//!
//! # Basic Usage
//!
//! ```
//! # #[cfg(feature = "p256")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use sd_jwt::{Algorithm, Es256Signer, Header, SdJwt, SdJwtFactory, SdJwtVerifier, SdObjectBuilder};
//! use serde_json::json;
//!
//! let issuer = Es256Signer::generate();
//!
//! // Issuer side.
//! let claims = SdObjectBuilder::new()
//!     .plain("iss", "https://example.com/issuer")
//!     .flat("given_name", "John")
//!     .flat("family_name", "Doe")
//!     .build()?;
//! let sd_jwt = SdJwt::issue(
//!     &SdJwtFactory::new(),
//!     &claims,
//!     &Header::new(Algorithm::ES256).with_type("example+sd-jwt"),
//!     &issuer,
//! )?;
//! let issued = sd_jwt.to_string();
//!
//! // Holder side.
//! let presentation = issued.parse::<SdJwt>()?.present(&["$.given_name"])?;
//!
//! // Verifier side.
//! let verified = SdJwtVerifier::new(issuer.verifier()).verify(&presentation)?;
//! assert_eq!(verified.claims["given_name"], json!("John"));
//! assert!(verified.claims.get("family_name").is_none());
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "p256"))]
//! # fn main() {}
//! ```
pub mod claim;
pub mod digest;
pub mod disclosure;
mod error;
pub mod factory;
pub mod jws;
pub mod json;
pub mod kb;
pub mod reveal;
mod sd_jwt;
pub mod select;
pub mod verify;

pub use claim::{SdArrayBuilder, SdElement, SdObject, SdObjectBuilder};
pub use digest::{
    DigestCreator, FixedSaltProvider, RandomSaltProvider, RngSaltProvider, SaltProvider, SdAlg,
};
pub use disclosure::{Disclosure, DisclosureKind};
pub use error::*;
pub use factory::{SdJwtFactory, UnsignedSdJwt};
pub use json::{ClaimAccess, ClaimPath, JsonPointerBuf};
pub use jws::{Algorithm, Header, JwsSigner, JwsVerifier};
#[cfg(feature = "p256")]
pub use jws::{Es256Signer, Es256Verifier};
pub use kb::{KeyBindingClaims, KeyBindingExpectation, KeyBindingProperties};
pub use reveal::RevealedClaims;
pub use sd_jwt::SdJwt;
pub use select::select_disclosures;
pub use verify::{SdJwtVerifier, VerificationOptions, VerifiedSdJwt};

/// Claim holding the digests of concealed object members.
pub const SD_CLAIM_NAME: &str = "_sd";

/// Claim naming the digest algorithm.
pub const SD_ALG_CLAIM_NAME: &str = "_sd_alg";

/// Key of the `{"...": <digest>}` placeholder of a concealed array item.
pub const ARRAY_CLAIM_ITEM_PROPERTY_NAME: &str = "...";
