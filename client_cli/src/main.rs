//! Kestrel client CLI

use std::{path::PathBuf, process::ExitCode, str::FromStr};

use erased_serde::Serialize;
use eyre::{bail, eyre, Result, WrapErr};
use kestrel_client::{ChainApi, Config, RpcClient};
use kestrel_crypto::Ss58Format;
use kestrel_data_model::ErrorKind;
use url::Url;

use crate::{
    accounts::{AccountStore, StoreError},
    terminal::{DialoguerPrompter, Prompter},
};

mod accounts;
mod terminal;

/// Command-line client for the Kestrel chain: offline transaction
/// construction, multisig coordination and signing.
#[derive(clap::Parser, Debug)]
#[command(name = "kestrel", version, author)]
struct Args {
    /// Path to the configuration file
    #[arg(
        short,
        long,
        value_name("PATH"),
        value_hint(clap::ValueHint::FilePath),
        default_value = "kestrel.json5"
    )]
    config: PathBuf,
    /// Node JSON-RPC endpoint, overrides the configuration file
    #[arg(long, value_name("URL"))]
    rpc_url: Option<Url>,
    /// SS58 address format, overrides the configuration file
    #[arg(long, value_name("FORMAT"))]
    ss58_format: Option<Ss58Format>,
    /// Keystore directory, overrides the configuration file
    #[arg(long, value_name("DIR"), value_hint(clap::ValueHint::DirPath))]
    keystore_dir: Option<PathBuf>,
    /// More verbose output
    #[arg(short, long)]
    verbose: bool,
    /// Subcommands of the client CLI
    #[command(subcommand)]
    subcommand: Subcommand,
}

#[derive(clap::Subcommand, Debug)]
enum Subcommand {
    /// The subcommands related to transactions
    #[clap(subcommand)]
    Transaction(transaction::Args),
    /// The subcommands related to stored accounts
    #[clap(subcommand)]
    Account(account::Args),
}

/// Context inside which a command is executed
trait RunContext {
    /// Get access to the configuration
    fn configuration(&self) -> &Config;

    /// Chain collaborator built from the configured endpoint
    fn chain_api(&self) -> Box<dyn ChainApi> {
        Box::new(RpcClient::new(self.configuration().rpc_url.clone()))
    }

    /// Account store rooted at the configured keystore directory
    fn accounts(&self) -> AccountStore {
        AccountStore::new(self.configuration().keystore_dir.clone())
    }

    /// Interactive prompt source
    fn prompter(&mut self) -> &mut dyn Prompter;

    /// Serialize and print data
    ///
    /// # Errors
    /// - if serialization fails
    /// - if printing fails
    fn print_data(&mut self, data: &dyn Serialize) -> Result<()>;
}

struct PrintJsonContext<W, P> {
    write: W,
    config: Config,
    prompt: P,
}

impl<W: std::io::Write, P: Prompter> RunContext for PrintJsonContext<W, P> {
    fn configuration(&self) -> &Config {
        &self.config
    }

    fn prompter(&mut self) -> &mut dyn Prompter {
        &mut self.prompt
    }

    fn print_data(&mut self, data: &dyn Serialize) -> Result<()> {
        writeln!(&mut self.write, "{}", serde_json::to_string_pretty(data)?)?;
        Ok(())
    }
}

/// Runs subcommand
trait RunArgs {
    /// Runs command
    ///
    /// # Errors
    /// if inner command errors
    fn run(self, context: &mut dyn RunContext) -> Result<()>;
}

macro_rules! match_all {
    (($self:ident, $context:ident), { $($variants:path),* $(,)?}) => {
        match $self {
            $($variants(variant) => RunArgs::run(variant, $context),)*
        }
    };
}

impl RunArgs for Subcommand {
    fn run(self, context: &mut dyn RunContext) -> Result<()> {
        use Subcommand::*;
        match_all!((self, context), { Transaction, Account })
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            eprintln!("Error: {report:?}");
            ExitCode::from(u8::try_from(exit_kind(&report).exit_code()).unwrap_or(1))
        }
    }
}

fn run() -> Result<()> {
    let args: Args = clap::Parser::parse();
    kestrel_logger::install_panic_hook()?;
    kestrel_logger::init_global(
        &kestrel_logger::Config {
            level: if args.verbose {
                kestrel_logger::Level::DEBUG
            } else {
                kestrel_logger::Level::WARN
            },
            format: kestrel_logger::Format::Compact,
        },
        true,
    )?;

    let mut config =
        Config::load(&args.config).wrap_err("Failed to load the client configuration")?;
    if let Some(url) = args.rpc_url {
        config.rpc_url = url;
    }
    if let Some(format) = args.ss58_format {
        config.ss58_format = format;
    }
    if let Some(dir) = args.keystore_dir {
        config.keystore_dir = dir;
    }
    if args.verbose {
        eprintln!(
            "Configuration: {}",
            serde_json::to_string_pretty(&config)
                .wrap_err("Failed to serialize the configuration")?
        );
    }

    let mut context = PrintJsonContext {
        write: std::io::stdout(),
        config,
        prompt: DialoguerPrompter,
    };
    args.subcommand.run(&mut context)
}

/// Walks the report chain for the first typed error and returns its
/// taxonomy bucket. Anything untyped is treated as invalid input.
fn exit_kind(report: &eyre::Report) -> ErrorKind {
    for cause in report.chain() {
        if let Some(error) = cause.downcast_ref::<kestrel_client::Error>() {
            return error.kind();
        }
        if let Some(error) = cause.downcast_ref::<kestrel_data_model::Error>() {
            return error.kind();
        }
        if let Some(error) = cause.downcast_ref::<StoreError>() {
            return error.kind();
        }
        if cause.downcast_ref::<std::io::Error>().is_some() {
            return ErrorKind::FsOperationFailed;
        }
    }
    ErrorKind::InvalidInput
}

mod transaction {
    //! Construction, multisig coordination, offline signing and
    //! submission of transactions.

    use kestrel_client::{ChainSnapshot, EnvelopeOptions};
    use kestrel_crypto::{hex_decode, AccountId32, Algorithm, Hash, KeyPair};
    use kestrel_data_model::{
        call::{OpaqueCall, Timepoint},
        multisig::{merge_params, MultisigParams, MultisigPlan},
        record::{read_json, MultisigTxData, SignedTransactionOutput, TransactionRecord},
        registry, signing, Balance, Weight,
    };
    use parity_scale_codec::Encode;

    use super::*;
    use crate::terminal::PasswordPolicy;

    /// Weight limit applied when neither the chain nor a params file
    /// supplies one.
    const FALLBACK_MAX_WEIGHT: Weight = 640_000_000;

    /// subcommands for the transaction subcommand
    #[derive(clap::Subcommand, Debug)]
    pub enum Args {
        /// Construct an ordinary unsigned transaction
        Construct(Construct),
        /// Open a multisig operation
        InitiateMultisig(InitiateMultisig),
        /// Approve an open multisig operation by hash
        ApproveMultisig(ApproveMultisig),
        /// Final approval that carries and dispatches the wrapped call
        FinalApproveMultisig(FinalApproveMultisig),
        /// Verify and sign a persisted record offline
        Sign(Sign),
        /// Submit a signed transaction to the chain
        Submit(Submit),
    }

    impl RunArgs for Args {
        fn run(self, context: &mut dyn RunContext) -> Result<()> {
            match_all!((self, context), {
                Args::Construct,
                Args::InitiateMultisig,
                Args::ApproveMultisig,
                Args::FinalApproveMultisig,
                Args::Sign,
                Args::Submit,
            })
        }
    }

    fn parse_address(address: &str) -> Result<(AccountId32, Ss58Format)> {
        AccountId32::from_ss58(address)
            .wrap_err_with(|| eyre!("`{address}` is not a valid SS58 address"))
    }

    fn save_record(
        record: &TransactionRecord,
        output: &PathBuf,
        context: &mut dyn RunContext,
    ) -> Result<()> {
        record.save(output)?;
        eprintln!("Unsigned transaction saved in: {}", output.display());
        context.print_data(&serde_json::json!({
            "output": output,
            "address": record.unsigned.address,
            "nonce": record.unsigned.nonce,
            "era": record.unsigned.era,
            "callHash": record.tx_data.call_hash,
        }))?;
        Ok(())
    }

    /// Construct an ordinary unsigned transaction
    #[derive(clap::Args, Debug)]
    pub struct Construct {
        /// Signer address, SS58
        #[arg(long)]
        pub address: String,
        /// Pallet of the call, e.g. `balances`
        #[arg(long)]
        pub module: String,
        /// Method of the call, e.g. `transfer`
        #[arg(long)]
        pub method: String,
        /// Call arguments as a JSON object
        #[arg(long)]
        pub args: String,
        /// File to write the unsigned record to
        #[arg(long, value_hint(clap::ValueHint::FilePath))]
        pub output: PathBuf,
        /// Mortality window in blocks, a power of two between 4 and 65536
        #[arg(long)]
        pub lifetime: Option<u64>,
        /// Priority fee in base units
        #[arg(long, default_value_t = 0)]
        pub tip: Balance,
        /// Added to the on-chain nonce for transaction queuing
        #[arg(long, default_value_t = 0)]
        pub nonce_increment: u32,
    }

    impl RunArgs for Construct {
        fn run(self, context: &mut dyn RunContext) -> Result<()> {
            let (signer, format) = parse_address(&self.address)?;
            let call_args: serde_json::Value = serde_json::from_str(&self.args)
                .wrap_err("`--args` is not valid JSON")?;
            let call = registry::build_call(&self.module, &self.method, &call_args)?;

            let api = context.chain_api();
            let snapshot = ChainSnapshot::capture(api.as_ref(), signer)?;
            let unsigned = snapshot.build_unsigned(
                call.encode(),
                &EnvelopeOptions {
                    nonce_increment: self.nonce_increment,
                    era_period: self.lifetime,
                    tip: self.tip,
                },
                format,
            )?;
            let record = TransactionRecord::for_envelope(unsigned, None)?;
            save_record(&record, &self.output, context)
        }
    }

    /// The multisig flags shared by the lifecycle commands.
    #[derive(clap::Args, Debug)]
    pub struct MultisigCommon {
        /// Acting signer address, SS58
        #[arg(long)]
        pub address_signer: String,
        /// File to write the unsigned record to
        #[arg(long, value_hint(clap::ValueHint::FilePath))]
        pub output: PathBuf,
        /// JSON params file with threshold, otherSignatories, callHash,
        /// maxWeight and timepoint
        #[arg(long, value_hint(clap::ValueHint::FilePath))]
        pub input: Option<PathBuf>,
        /// Mortality window in blocks
        #[arg(long)]
        pub lifetime: Option<u64>,
        /// Priority fee in base units
        #[arg(long, default_value_t = 0)]
        pub tip: Balance,
        /// Added to the on-chain nonce for transaction queuing
        #[arg(long, default_value_t = 0)]
        pub nonce_increment: u32,
    }

    impl MultisigCommon {
        fn file_params(&self) -> Result<MultisigParams> {
            Ok(match &self.input {
                Some(path) => read_json(path)?,
                None => MultisigParams::default(),
            })
        }

        fn envelope(
            &self,
            context: &mut dyn RunContext,
            plan: &MultisigPlan,
        ) -> Result<TransactionRecord> {
            let (signer, format) = parse_address(&self.address_signer)?;
            let api = context.chain_api();
            let snapshot = ChainSnapshot::capture(api.as_ref(), signer)?;
            eprintln!(
                "Signer free balance: {} base units",
                snapshot.free_balance()
            );
            let unsigned = snapshot.build_unsigned(
                plan.call.encode(),
                &EnvelopeOptions {
                    nonce_increment: self.nonce_increment,
                    era_period: self.lifetime,
                    tip: self.tip,
                },
                format,
            )?;
            let multisig_tx_data = plan.wrapped_call.as_ref().map(MultisigTxData::new);
            Ok(TransactionRecord::for_envelope(unsigned, multisig_tx_data)?)
        }
    }

    /// Open a multisig operation
    #[derive(clap::Args, Debug)]
    pub struct InitiateMultisig {
        #[command(flatten)]
        pub common: MultisigCommon,
        /// SCALE encoded call to wrap, as 0x-prefixed hex
        #[arg(long)]
        pub call: String,
        /// Approvals required to dispatch
        #[arg(long)]
        pub threshold: Option<u16>,
        /// The other signatories, comma separated SS58 addresses
        #[arg(long, value_delimiter = ',')]
        pub other_signatories: Option<Vec<String>>,
        /// Multisig address the operation is expected to belong to
        #[arg(long)]
        pub multisig_address: Option<String>,
    }

    impl RunArgs for InitiateMultisig {
        fn run(self, context: &mut dyn RunContext) -> Result<()> {
            let (signer, format) = parse_address(&self.common.address_signer)?;
            let wrapped = OpaqueCall::new(hex_decode(&self.call)?);

            let api = context.chain_api();
            let fresh_weight = api.estimate_weight(wrapped.as_bytes())?;
            let params = merge_params(
                self.common.file_params()?,
                MultisigParams {
                    threshold: self.threshold,
                    other_signatories: self.other_signatories.clone(),
                    max_weight: Some(fresh_weight),
                    ..MultisigParams::default()
                },
            )?;
            let set = params.signatory_set(signer)?;
            let plan = MultisigPlan::initiate(&set, wrapped, params.call_hash, fresh_weight)?;

            let derived = plan.multisig_address.to_ss58(format);
            eprintln!("Multisig address: {derived}");
            if let Some(expected) = &self.multisig_address {
                let (expected_id, _) = parse_address(expected)?;
                if expected_id != plan.multisig_address {
                    let go_on = context.prompter().confirm(&format!(
                        "The derived multisig address {derived} differs from the expected {expected}. Continue?"
                    ))?;
                    if !go_on {
                        bail!("aborted: the multisig address does not match the derived one");
                    }
                }
            }

            let record = self.common.envelope(context, &plan)?;
            save_record(&record, &self.common.output, context)
        }
    }

    /// Approve an open multisig operation by hash
    #[derive(clap::Args, Debug)]
    pub struct ApproveMultisig {
        #[command(flatten)]
        pub common: MultisigCommon,
        /// Hash of the call being approved, overrides the params file
        #[arg(long)]
        pub call_hash: Option<Hash>,
        /// Block number of the opening extrinsic
        #[arg(long, requires = "timepoint_index")]
        pub timepoint_height: Option<u32>,
        /// Index of the opening extrinsic within its block
        #[arg(long, requires = "timepoint_height")]
        pub timepoint_index: Option<u32>,
    }

    fn flag_timepoint(height: Option<u32>, index: Option<u32>) -> Option<Timepoint> {
        Some(Timepoint::new(height?, index?))
    }

    impl RunArgs for ApproveMultisig {
        fn run(self, context: &mut dyn RunContext) -> Result<()> {
            let (signer, _) = parse_address(&self.common.address_signer)?;
            let params = merge_params(
                self.common.file_params()?,
                MultisigParams {
                    call_hash: self.call_hash,
                    timepoint: flag_timepoint(self.timepoint_height, self.timepoint_index),
                    ..MultisigParams::default()
                },
            )?;
            let set = params.signatory_set(signer)?;
            let call_hash = params.call_hash.ok_or_else(|| {
                eyre!("a call hash is required, pass `--call-hash` or a params file")
            })?;
            let timepoint = params.required_timepoint()?;
            let max_weight = params.max_weight.unwrap_or(FALLBACK_MAX_WEIGHT);
            let plan = MultisigPlan::approve(&set, call_hash, timepoint, max_weight)?;

            let record = self.common.envelope(context, &plan)?;
            save_record(&record, &self.common.output, context)
        }
    }

    /// Final approval that carries and dispatches the wrapped call
    #[derive(clap::Args, Debug)]
    pub struct FinalApproveMultisig {
        #[command(flatten)]
        pub common: MultisigCommon,
        /// SCALE encoded wrapped call, as 0x-prefixed hex
        #[arg(long)]
        pub call: String,
        /// Block number of the opening extrinsic
        #[arg(long, requires = "timepoint_index")]
        pub timepoint_height: Option<u32>,
        /// Index of the opening extrinsic within its block
        #[arg(long, requires = "timepoint_height")]
        pub timepoint_index: Option<u32>,
    }

    impl RunArgs for FinalApproveMultisig {
        fn run(self, context: &mut dyn RunContext) -> Result<()> {
            let (signer, _) = parse_address(&self.common.address_signer)?;
            let wrapped = OpaqueCall::new(hex_decode(&self.call)?);

            let api = context.chain_api();
            let fresh_weight = api.estimate_weight(wrapped.as_bytes())?;
            let params = merge_params(
                self.common.file_params()?,
                MultisigParams {
                    timepoint: flag_timepoint(self.timepoint_height, self.timepoint_index),
                    max_weight: Some(fresh_weight),
                    ..MultisigParams::default()
                },
            )?;
            let set = params.signatory_set(signer)?;
            let timepoint = params.required_timepoint()?;
            let plan = MultisigPlan::final_approve(
                &set,
                wrapped,
                params.call_hash,
                timepoint,
                fresh_weight,
            )?;

            let record = self.common.envelope(context, &plan)?;
            save_record(&record, &self.common.output, context)
        }
    }

    /// Verify and sign a persisted record offline
    #[derive(clap::Args, Debug)]
    #[command(group(
        clap::ArgGroup::new("key_source")
            .args(["mnemonic", "seed", "suri", "backup"])
            .multiple(false)
    ))]
    pub struct Sign {
        /// The unsigned record file
        #[arg(long, value_hint(clap::ValueHint::FilePath))]
        pub input: PathBuf,
        /// File to write the signed output to
        #[arg(long, value_hint(clap::ValueHint::FilePath))]
        pub output: Option<PathBuf>,
        /// BIP39 mnemonic of the signing key
        #[arg(long)]
        pub mnemonic: Option<String>,
        /// 32-byte secret seed of the signing key, as 0x-prefixed hex
        #[arg(long)]
        pub seed: Option<String>,
        /// Secret URI of the signing key
        #[arg(long)]
        pub suri: Option<String>,
        /// Exported account backup file
        #[arg(long, value_hint(clap::ValueHint::FilePath))]
        pub backup: Option<PathBuf>,
        /// Signature scheme of the key
        #[arg(long, default_value_t = Algorithm::Ed25519)]
        pub keypair_type: Algorithm,
        /// Password prompt attempts before giving up
        #[arg(long, default_value_t = 3)]
        pub password_attempts: u32,
        /// Skip the interactive confirmation
        #[arg(long)]
        pub yes: bool,
    }

    impl Sign {
        fn resolve_key(
            &self,
            record: &TransactionRecord,
            context: &mut dyn RunContext,
        ) -> Result<KeyPair> {
            let policy = PasswordPolicy {
                max_attempts: self.password_attempts,
            };
            if let Some(phrase) = &self.mnemonic {
                return Ok(KeyPair::from_suri(phrase, self.keypair_type)?);
            }
            if let Some(seed) = &self.seed {
                let bytes = hex_decode(seed)?;
                let seed = <[u8; 32]>::try_from(bytes.as_slice())
                    .map_err(|_| eyre!("`--seed` must be 32 bytes of hex"))?;
                return Ok(KeyPair::from_seed(seed, self.keypair_type)?);
            }
            if let Some(suri) = &self.suri {
                return Ok(KeyPair::from_suri(suri, self.keypair_type)?);
            }
            if let Some(path) = &self.backup {
                let account = AccountStore::read_backup(path)?;
                return policy.unseal(&account, context.prompter());
            }
            // No key source named: look up the envelope address in the
            // account store.
            let (signer, _) = parse_address(&record.unsigned.address)?;
            let account = context.accounts().find_by_address(signer)?;
            policy.unseal(&account, context.prompter())
        }
    }

    impl RunArgs for Sign {
        fn run(self, context: &mut dyn RunContext) -> Result<()> {
            let record = TransactionRecord::load(&self.input)?;
            let key_pair = self.resolve_key(&record, context)?;

            let intent = signing::verify(&record, key_pair.public_key())?;
            context.print_data(&intent)?;
            if !self.yes {
                let go_on = context
                    .prompter()
                    .confirm("Sign this transaction?")?;
                if !go_on {
                    bail!("aborted before signing");
                }
            }

            let signed = signing::sign(&record, &key_pair)?;
            if let Some(path) = &self.output {
                signed.save(path)?;
                eprintln!("Signed transaction saved in: {}", path.display());
            }
            context.print_data(&serde_json::json!({
                "txHash": signed.tx_hash,
                "signedTx": signed.signed_tx,
            }))?;
            Ok(())
        }
    }

    /// Submit a signed transaction to the chain
    #[derive(clap::Args, Debug)]
    pub struct Submit {
        /// The signed output file produced by `transaction sign`
        #[arg(long, value_hint(clap::ValueHint::FilePath))]
        pub input: PathBuf,
    }

    impl RunArgs for Submit {
        fn run(self, context: &mut dyn RunContext) -> Result<()> {
            let signed = SignedTransactionOutput::load(&self.input)?;
            let api = context.chain_api();
            let hash = api.submit_extrinsic(signed.signed_tx.as_slice())?;
            context.print_data(&serde_json::json!({ "txHash": hash }))?;
            Ok(())
        }
    }
}

mod account {
    //! Management of the encrypted account store.

    use kestrel_crypto::{
        hex_decode,
        suri::{generate_mnemonic, Suri},
        Algorithm, KeyPair,
    };

    use super::*;
    use crate::accounts::StoredAccount;

    /// subcommands for the account subcommand
    #[derive(clap::Subcommand, Debug)]
    pub enum Args {
        /// Generate a fresh account and store it encrypted
        Create(Create),
        /// Import an existing key into the store
        Import(Import),
        /// List stored accounts
        List(List),
        /// Copy an account file to a backup location
        Export(Export),
        /// Remove an account from the store
        Forget(Forget),
    }

    impl RunArgs for Args {
        fn run(self, context: &mut dyn RunContext) -> Result<()> {
            match_all!((self, context), {
                Args::Create,
                Args::Import,
                Args::List,
                Args::Export,
                Args::Forget,
            })
        }
    }

    fn parse_address(address: &str) -> Result<kestrel_crypto::AccountId32> {
        Ok(kestrel_crypto::AccountId32::from_ss58(address)
            .wrap_err_with(|| eyre!("`{address}` is not a valid SS58 address"))?
            .0)
    }

    fn store_sealed(
        name: &str,
        seed: [u8; 32],
        algorithm: Algorithm,
        context: &mut dyn RunContext,
    ) -> Result<()> {
        let key_pair = KeyPair::from_seed(seed, algorithm)?;
        let password = context
            .prompter()
            .new_password("Password to encrypt the account (empty for none)")?;
        let format = context.configuration().ss58_format;
        let account = StoredAccount::seal(name, &key_pair, &seed, &password, format)?;
        let path = context.accounts().save(&account)?;
        eprintln!("Account saved in: {}", path.display());
        context.print_data(&serde_json::json!({
            "name": account.name,
            "address": account.address,
            "algorithm": account.algorithm,
        }))?;
        Ok(())
    }

    /// Generate a fresh account and store it encrypted
    #[derive(clap::Args, Debug)]
    pub struct Create {
        /// Label for the new account, also the file name
        #[arg(long)]
        pub name: String,
        /// Signature scheme of the new key
        #[arg(long, default_value_t = Algorithm::Ed25519)]
        pub keypair_type: Algorithm,
    }

    impl RunArgs for Create {
        fn run(self, context: &mut dyn RunContext) -> Result<()> {
            let mnemonic = generate_mnemonic(12)?;
            let suri: Suri = mnemonic.parse()?;
            let seed = suri.seed(self.keypair_type);

            eprintln!("Recovery phrase (write it down, it is shown only once):");
            eprintln!("    {mnemonic}");

            store_sealed(&self.name, seed, self.keypair_type, context)
        }
    }

    /// Import an existing key into the store
    #[derive(clap::Args, Debug)]
    #[command(group(
        clap::ArgGroup::new("key_source")
            .args(["mnemonic", "seed", "suri"])
            .required(true)
            .multiple(false)
    ))]
    pub struct Import {
        /// Label for the imported account, also the file name
        #[arg(long)]
        pub name: String,
        /// BIP39 mnemonic of the key
        #[arg(long)]
        pub mnemonic: Option<String>,
        /// 32-byte secret seed, as 0x-prefixed hex
        #[arg(long)]
        pub seed: Option<String>,
        /// Secret URI of the key
        #[arg(long)]
        pub suri: Option<String>,
        /// Signature scheme of the key
        #[arg(long, default_value_t = Algorithm::Ed25519)]
        pub keypair_type: Algorithm,
    }

    impl RunArgs for Import {
        fn run(self, context: &mut dyn RunContext) -> Result<()> {
            let seed = if let Some(raw) = &self.seed {
                let bytes = hex_decode(raw)?;
                <[u8; 32]>::try_from(bytes.as_slice())
                    .map_err(|_| eyre!("`--seed` must be 32 bytes of hex"))?
            } else {
                let source = self
                    .mnemonic
                    .as_deref()
                    .or(self.suri.as_deref())
                    .ok_or_else(|| eyre!("one of `--mnemonic`, `--seed`, `--suri` is required"))?;
                let suri = Suri::from_str(source)?;
                suri.seed(self.keypair_type)
            };
            store_sealed(&self.name, seed, self.keypair_type, context)
        }
    }

    /// List stored accounts
    #[derive(clap::Args, Debug)]
    pub struct List;

    impl RunArgs for List {
        fn run(self, context: &mut dyn RunContext) -> Result<()> {
            let accounts = context.accounts().list()?;
            let listing: Vec<_> = accounts
                .iter()
                .map(|account| {
                    serde_json::json!({
                        "name": account.name,
                        "address": account.address,
                        "algorithm": account.algorithm,
                        "createdAt": account.created_at,
                    })
                })
                .collect();
            context.print_data(&listing)?;
            Ok(())
        }
    }

    /// Copy an account file to a backup location
    #[derive(clap::Args, Debug)]
    pub struct Export {
        /// Address of the account to export
        #[arg(long)]
        pub address: String,
        /// Destination file for the backup
        #[arg(long, value_hint(clap::ValueHint::FilePath))]
        pub output: PathBuf,
    }

    impl RunArgs for Export {
        fn run(self, context: &mut dyn RunContext) -> Result<()> {
            let account_id = parse_address(&self.address)?;
            context.accounts().export(account_id, &self.output)?;
            eprintln!("Account backup saved in: {}", self.output.display());
            Ok(())
        }
    }

    /// Remove an account from the store
    #[derive(clap::Args, Debug)]
    pub struct Forget {
        /// Address of the account to remove
        #[arg(long)]
        pub address: String,
        /// Skip the interactive confirmation
        #[arg(long)]
        pub yes: bool,
    }

    impl RunArgs for Forget {
        fn run(self, context: &mut dyn RunContext) -> Result<()> {
            let account_id = parse_address(&self.address)?;
            if !self.yes {
                let go_on = context.prompter().confirm(&format!(
                    "Forget the account `{}`? Without a backup the key is gone",
                    self.address
                ))?;
                if !go_on {
                    bail!("aborted, the account was kept");
                }
            }
            let forgotten = context.accounts().forget(account_id)?;
            eprintln!("Account `{}` removed from the store", forgotten.name);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use kestrel_crypto::{AccountId32, Hash};
    use kestrel_data_model::Error as CoreError;

    use super::*;

    #[test]
    fn exit_kind_finds_typed_errors_in_the_chain() {
        let report = eyre::Report::new(CoreError::CallHashMismatch {
            declared: Hash::new(b"a"),
            computed: Hash::new(b"b"),
        })
        .wrap_err("while planning the approval");
        assert_eq!(exit_kind(&report), ErrorKind::CallHashMismatch);

        let report = eyre::Report::new(kestrel_client::Error::Chain {
            method: "chain_getHeader",
            reason: "timeout".to_owned(),
        });
        assert_eq!(exit_kind(&report), ErrorKind::ChainUnavailable);

        let report = eyre::Report::new(StoreError::NoAccount(
            AccountId32::new([1; 32]).to_string(),
        ));
        assert_eq!(exit_kind(&report), ErrorKind::NoAccountFound);

        let report = eyre!("anything untyped");
        assert_eq!(exit_kind(&report), ErrorKind::InvalidInput);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory as _;
        Args::command().debug_assert();
    }
}
